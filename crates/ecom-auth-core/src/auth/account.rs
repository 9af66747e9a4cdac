//! Account handle for one E-Com Plus administrator.
//!
//! `EcomAuth` owns the session, the instance language and the event
//! observers. Every remote call goes through its `Transport`, signed with the
//! store id and, once logged in, the authentication id and access token.

use std::fmt;
use std::sync::Arc;

use md5::{Digest, Md5};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::events::{AuthEvent, EventChannel, EventKind, ListenerId};
use super::session::{self, Session};
use crate::api::{ApiError, ApiRequest, HttpTransport, Method, RequestOptions, Transport};
use crate::config::{is_persistable_store_id, ConfigStore};
use crate::models::{AuthenticationInfo, StoreInfo};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "_id")]
    id: String,
    api_key: String,
    store_id: Option<u32>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthenticateResponse {
    my_id: String,
    access_token: String,
    expires: Option<String>,
}

fn parse<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
}

/// The login endpoint expects the password as a lowercase hex MD5 digest
fn password_digest(password: &str) -> String {
    format!("{:x}", Md5::digest(password.as_bytes()))
}

pub struct EcomAuth {
    store_id: u32,
    lang: Option<String>,
    session: Session,
    config: ConfigStore,
    transport: Arc<dyn Transport>,
    events: EventChannel,
    authentication: Option<AuthenticationInfo>,
    store: Option<StoreInfo>,
}

impl EcomAuth {
    /// Create a handle bound to `store_id`, falling back to the configured
    /// store id when absent or zero.
    pub fn new(
        transport: Arc<dyn Transport>,
        config: ConfigStore,
        store_id: Option<u32>,
        lang: Option<String>,
    ) -> Self {
        let store_id = store_id
            .filter(|id| *id > 0)
            .unwrap_or_else(|| config.store_id());
        debug!(store_id, ?lang, "Account handle created");

        Self {
            store_id,
            lang: lang.filter(|l| !l.is_empty()),
            session: Session::for_store(store_id),
            config,
            transport,
            events: EventChannel::new(),
            authentication: None,
            store: None,
        }
    }

    /// Create a handle talking to the production API over HTTPS
    pub fn with_http(
        config: ConfigStore,
        store_id: Option<u32>,
        lang: Option<String>,
    ) -> Result<Self, ApiError> {
        Ok(Self::new(Arc::new(HttpTransport::new()?), config, store_id, lang))
    }

    pub fn store_id(&self) -> u32 {
        self.store_id
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&AuthEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn once<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&AuthEvent) + Send + Sync + 'static,
    {
        self.events.once(kind, listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    // =========================================================================
    // Session state
    // =========================================================================

    pub fn check_login(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn get_authentication_id(&self) -> Option<&str> {
        self.session.authentication_id()
    }

    pub fn get_session(&self) -> &Session {
        &self.session
    }

    /// Merge a partial session.
    ///
    /// Only truthy values are written, so a field cannot be cleared through
    /// here. A store id above the reserved range is persisted to config. When
    /// the merged session is logged in, `Login` is emitted first and then,
    /// if the handle has no language yet, the authentication is fetched and
    /// its locale adopted. A failed locale fetch is only logged.
    pub async fn set_session(&mut self, update: Session) -> &mut Self {
        let written = self.session.merge_truthy(update);
        debug!(keys = ?written, "Session updated");

        if written
            .iter()
            .any(|k| k == session::MY_ID || k == session::ACCESS_TOKEN)
        {
            self.authentication = None;
            self.store = None;
        }

        if let Some(store_id) = self.session.store_id().filter(|id| *id > 0) {
            if store_id != self.store_id {
                debug!(from = self.store_id, to = store_id, "Store changed");
                self.store = None;
            }
            self.store_id = store_id;
            if is_persistable_store_id(store_id) {
                self.config.set_store_id(store_id);
            }
        }

        if self.check_login() {
            let notified = self.events.emit(&AuthEvent::Login(self.session.clone()));
            debug!(listeners = notified, "Login event emitted");

            if self.lang.is_none() {
                match self.fetch_authentication(false).await {
                    Ok(auth) => {
                        if let Some(locale) = auth.locale() {
                            self.adopt_lang(locale.to_string());
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to fetch authentication locale"),
                }
            }
        }

        self
    }

    fn adopt_lang(&mut self, lang: String) {
        debug!(lang = %lang, "Language set from authentication");
        self.session.insert(session::LANG, Value::String(lang.clone()));
        self.config.set_lang(lang.clone());
        self.lang = Some(lang);
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    /// Log in with a username or email and a plain password
    pub async fn login(&mut self, user_or_email: &str, password: &str) -> Result<&mut Self, ApiError> {
        let user_or_email = user_or_email.trim();
        if user_or_email.is_empty() || password.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Username and password required".to_string(),
            ));
        }

        let field = if user_or_email.contains('@') { "email" } else { "username" };
        let mut body = Map::new();
        body.insert(field.to_string(), Value::from(user_or_email));
        body.insert("pass".to_string(), Value::from(password_digest(password)));
        let request = ApiRequest::post(format!("_login.json?{}", field))
            .with_store_id(self.store_id)
            .with_data(Some(Value::Object(body)));
        let login: LoginResponse = parse(self.transport.send(request).await?, "login response")?;

        let request = ApiRequest::post("_authenticate.json")
            .with_store_id(self.store_id)
            .with_data(Some(json!({
                "_id": login.id,
                "api_key": login.api_key,
            })));
        let auth: AuthenticateResponse =
            parse(self.transport.send(request).await?, "authenticate response")?;
        if auth.my_id.is_empty() || auth.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Authentication returned empty credentials".to_string(),
            ));
        }

        info!(store_id = self.store_id, my_id = %auth.my_id, "Login successful");
        let update = Session::from_value(json!({
            "store_id": login.store_id.unwrap_or(self.store_id),
            "username": login.username.unwrap_or_else(|| user_or_email.to_string()),
            "my_id": auth.my_id,
            "access_token": auth.access_token,
            "expires": auth.expires,
        }));
        Ok(self.set_session(update).await)
    }

    /// Open a fresh admin session for the current authentication and merge it
    pub async fn create_session(&mut self) -> Result<&mut Self, ApiError> {
        if !self.check_login() {
            return Err(ApiError::NotLoggedIn);
        }
        let value = self
            .request_api("_session.json", Method::POST, None, RequestOptions::default())
            .await?;
        Ok(self.set_session(Session::from_value(value)).await)
    }

    /// Drop the login fields from the session and emit `Logout`.
    /// Store id and language are kept. Nothing is emitted when already
    /// logged out.
    pub fn logout(&mut self) -> &mut Self {
        let was_logged_in = self.check_login();
        for key in session::LOGIN_KEYS {
            self.session.remove(key);
        }
        self.authentication = None;
        self.store = None;

        if was_logged_in {
            info!(store_id = self.store_id, "Logged out");
            self.events.emit(&AuthEvent::Logout);
        }
        self
    }

    // =========================================================================
    // Remote metadata
    // =========================================================================

    /// Fetch the logged-in administrator's authentication document.
    /// The last result is reused unless `skip_cache` is set.
    pub async fn fetch_authentication(&mut self, skip_cache: bool) -> Result<AuthenticationInfo, ApiError> {
        if !skip_cache {
            if let Some(ref cached) = self.authentication {
                debug!("Using cached authentication");
                return Ok(cached.clone());
            }
        }

        let my_id = self
            .get_authentication_id()
            .ok_or(ApiError::NotLoggedIn)?
            .to_string();
        let value = self
            .request_api(
                &format!("authentications/{}.json", my_id),
                Method::GET,
                None,
                RequestOptions::default(),
            )
            .await?;
        let auth: AuthenticationInfo = parse(value, "authentication")?;
        self.authentication = Some(auth.clone());
        Ok(auth)
    }

    /// Fetch the store document. The last result is reused unless
    /// `skip_cache` is set.
    pub async fn fetch_store(&mut self, skip_cache: bool) -> Result<StoreInfo, ApiError> {
        if !skip_cache {
            if let Some(ref cached) = self.store {
                debug!("Using cached store");
                return Ok(cached.clone());
            }
        }

        let value = self
            .request_api("stores/me.json", Method::GET, None, RequestOptions::default())
            .await?;
        let store: StoreInfo = parse(value, "store")?;
        self.store = Some(store.clone());
        Ok(store)
    }

    // =========================================================================
    // Generic requests
    // =========================================================================

    /// Call any API resource with the current session's credentials.
    /// Transport errors are returned as they are.
    pub async fn request_api(
        &self,
        path: &str,
        method: Method,
        data: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let request = ApiRequest::new(method, path)
            .with_store_id(self.store_id)
            .with_credentials(self.session.credentials())
            .with_data(data)
            .with_options(options);
        self.transport.send(request).await
    }
}

impl fmt::Debug for EcomAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcomAuth")
            .field("store_id", &self.store_id)
            .field("lang", &self.lang)
            .field("logged_in", &self.check_login())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
