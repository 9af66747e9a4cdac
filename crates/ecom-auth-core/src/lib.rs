//! Client-side session manager for the E-Com Plus administration API.
//!
//! An [`EcomAuth`] handle logs an administrator in, keeps the resulting
//! session, and signs every API call with it:
//!
//! ```no_run
//! use ecom_auth_core::{ConfigStore, EcomAuth, Method, RequestOptions};
//!
//! # async fn example() -> Result<(), ecom_auth_core::ApiError> {
//! let mut auth = EcomAuth::with_http(ConfigStore::in_memory(), Some(2000), None)?;
//! auth.login("owner@example.com", "secret").await?;
//! assert!(auth.check_login());
//!
//! let orders = auth
//!     .request_api("orders.json", Method::GET, None, RequestOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, ApiRequest, HttpTransport, Method, RequestOptions, Transport};
pub use auth::{AuthEvent, CredentialStore, EcomAuth, EventKind, ListenerId, Session};
pub use config::{Config, ConfigStore, DEFAULT_STORE_ID};
pub use models::{AuthenticationInfo, StoreInfo};
