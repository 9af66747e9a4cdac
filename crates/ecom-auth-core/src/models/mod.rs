//! Typed views over metadata returned by the store API.
//!
//! - `AuthenticationInfo`: the logged-in administrator (`authentications/{id}.json`)
//! - `StoreInfo`: the store the handle is bound to (`stores/me.json`)
//!
//! Fields the remote adds that are not modeled here are kept in `extra`.

pub mod authentication;
pub mod store;

pub use authentication::AuthenticationInfo;
pub use store::StoreInfo;
