//! Authentication module for E-Com Plus admin accounts.
//!
//! This module provides:
//! - `EcomAuth`: the account handle (login, session mutation, fetchers, requests)
//! - `Session`: the free-form session mapping with merge-on-truthy updates
//! - `EventChannel`: typed login/logout observers owned by the handle
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! Sessions live in memory only; the store id and language are the only
//! values that outlive a handle, through `ConfigStore`.

pub mod account;
pub mod credentials;
pub mod events;
pub mod session;

pub use account::EcomAuth;
pub use credentials::CredentialStore;
pub use events::{AuthEvent, EventChannel, EventKind, ListenerId};
pub use session::Session;
