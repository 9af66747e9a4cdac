use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "ecom-auth";

/// Administrator passwords kept in the OS keychain, one entry per
/// store and login name.
pub struct CredentialStore;

impl CredentialStore {
    fn entry(store_id: u32, username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &Self::account_key(store_id, username))
            .context("Failed to create keyring entry")
    }

    /// Keyring account name; the same login may exist in several stores
    fn account_key(store_id: u32, username: &str) -> String {
        format!("{}@{}", username.trim().to_lowercase(), store_id)
    }

    pub fn store(store_id: u32, username: &str, password: &str) -> Result<()> {
        Self::entry(store_id, username)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    pub fn get_password(store_id: u32, username: &str) -> Result<String> {
        Self::entry(store_id, username)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    pub fn delete(store_id: u32, username: &str) -> Result<()> {
        Self::entry(store_id, username)?
            .delete_credential()
            .context("Failed to delete credential from keychain")
    }

    pub fn has_credentials(store_id: u32, username: &str) -> bool {
        Self::entry(store_id, username)
            .and_then(|entry| entry.get_password().map_err(Into::into))
            .is_ok()
    }
}
