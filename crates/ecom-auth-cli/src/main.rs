//! ecom-auth - command-line access to the E-Com Plus administration API.
//!
//! Logs an administrator in (credentials from the environment, the OS
//! keychain or a prompt) and runs one command with the resulting session.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ecom_auth_core::{
    AuthEvent, ConfigStore, CredentialStore, EcomAuth, EventKind, Method, RequestOptions,
};

/// Log file name prefix inside `--log-dir`
const LOG_FILE_PREFIX: &str = "ecom-auth.log";

#[derive(Debug, Parser)]
#[command(name = "ecom-auth", version, about = "E-Com Plus admin authentication")]
struct Cli {
    /// Store ID (defaults to the configured one)
    #[arg(long, env = "ECOM_STORE_ID", global = true)]
    store_id: Option<u32>,

    /// Snake case language code, e.g. en_us
    #[arg(long, env = "ECOM_LANG", global = true)]
    lang: Option<String>,

    /// Username or email
    #[arg(long, short, env = "ECOM_USERNAME", global = true)]
    user: Option<String>,

    /// Write logs to a daily rolling file in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and print the session
    Login {
        /// Save the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },
    /// Log in and print the authenticated administrator
    Whoami,
    /// Print the store document
    Store,
    /// Call an API resource with the session's credentials
    Request {
        /// Resource path, e.g. products.json
        path: String,
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,
        /// JSON request body
        #[arg(long, short)]
        data: Option<String>,
        /// Query parameter as key=value (repeatable)
        #[arg(long = "query", short)]
        query: Vec<String>,
        /// Skip login and call without credentials
        #[arg(long)]
        anonymous: bool,
    },
    /// Remove a remembered password from the OS keychain
    Forget,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref());

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => ConfigStore::open(path)?,
        None => ConfigStore::open_default().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            ConfigStore::in_memory()
        }),
    };

    let mut auth = EcomAuth::with_http(config, cli.store_id, cli.lang.clone())
        .context("Failed to create HTTP client")?;
    auth.on(EventKind::Login, |event| {
        if let AuthEvent::Login(session) = event {
            info!(my_id = ?session.authentication_id(), "Logged in");
        }
    });
    debug!(store_id = auth.store_id(), "Account handle ready");

    match cli.command {
        Command::Login { remember } => {
            let (user, password) = credentials(&cli.user, auth.store_id())?;
            auth.login(&user, &password).await?;
            if remember {
                CredentialStore::store(auth.store_id(), &user, &password)?;
                eprintln!("Password saved to keychain");
            }
            print_json(&auth.get_session().clone().into_value())?;
        }
        Command::Whoami => {
            let (user, password) = credentials(&cli.user, auth.store_id())?;
            auth.login(&user, &password).await?;
            let me = auth.fetch_authentication(false).await?;
            println!("{}", me.display_name());
            print_json(&serde_json::to_value(&me)?)?;
        }
        Command::Store => {
            let store = auth.fetch_store(true).await?;
            println!("{}", store.display_name());
            print_json(&serde_json::to_value(&store)?)?;
        }
        Command::Request {
            path,
            method,
            data,
            query,
            anonymous,
        } => {
            if !anonymous {
                let (user, password) = credentials(&cli.user, auth.store_id())?;
                auth.login(&user, &password).await?;
            }
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method: {}", method))?;
            let data = data
                .map(|d| serde_json::from_str::<Value>(&d))
                .transpose()
                .context("Request body is not valid JSON")?;
            let options = parse_query(&query)?
                .into_iter()
                .fold(RequestOptions::default(), |opts, (k, v)| opts.query(k, v));

            let response = auth.request_api(&path, method, data, options).await?;
            print_json(&response)?;
        }
        Command::Forget => {
            let user = cli.user.context("--user is required")?;
            CredentialStore::delete(auth.store_id(), &user)?;
            eprintln!("Password removed from keychain");
        }
    }

    auth.logout();
    Ok(())
}

/// Resolve the login name and password: environment first, then the
/// keychain, then an interactive prompt.
fn credentials(user: &Option<String>, store_id: u32) -> Result<(String, String)> {
    let user = match user {
        Some(user) => user.clone(),
        None => prompt_username()?,
    };
    if user.is_empty() {
        anyhow::bail!("Username required");
    }

    if let Ok(password) = std::env::var("ECOM_PASSWORD") {
        return Ok((user, password));
    }
    if CredentialStore::has_credentials(store_id, &user) {
        debug!(user = %user, "Using stored password");
        return Ok((user.clone(), CredentialStore::get_password(store_id, &user)?));
    }
    let password = rpassword::prompt_password("Password: ")?;
    Ok((user, password))
}

fn prompt_username() -> Result<String> {
    eprint!("Username or email: ");
    io::stderr().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

fn parse_query(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("Query parameter must be key=value: {}", pair))
        })
        .collect()
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let pairs = parse_query(&["limit=5".to_string(), "fields=name,sku".to_string()]).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("limit".to_string(), "5".to_string()),
                ("fields".to_string(), "name,sku".to_string()),
            ]
        );
        assert!(parse_query(&["oops".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_request() {
        let cli = Cli::try_parse_from([
            "ecom-auth", "--store-id", "2000", "request", "orders.json", "-X", "post", "-d", "{}",
        ])
        .unwrap();
        assert_eq!(cli.store_id, Some(2000));
        match cli.command {
            Command::Request { path, method, data, .. } => {
                assert_eq!(path, "orders.json");
                assert_eq!(method, "post");
                assert_eq!(data.as_deref(), Some("{}"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
