//! OS keychain credential store
//!
//! Persists the token triple and the device id as four secrets under one
//! keychain service. `keyring` picks the platform backend: macOS Keychain,
//! Windows Credential Manager, or the kernel keyring on Linux.

use async_trait::async_trait;
use geoquest_core::CredentialStore;
use geoquest_domain::constants::{
    DEFAULT_KEYCHAIN_SERVICE, STORAGE_KEY_ACCESS_TOKEN, STORAGE_KEY_DEVICE_ID,
    STORAGE_KEY_REFRESH_TOKEN, STORAGE_KEY_USER_ID,
};
use geoquest_domain::{ClientConfig, Credentials, Result};
use keyring::Entry;
use tracing::debug;

use crate::errors::KeychainError;

const CREDENTIAL_KEYS: [&str; 3] =
    [STORAGE_KEY_ACCESS_TOKEN, STORAGE_KEY_REFRESH_TOKEN, STORAGE_KEY_USER_ID];

#[derive(Debug, Clone)]
pub struct KeychainCredentialStore {
    service_name: String,
}

impl KeychainCredentialStore {
    /// # Arguments
    /// * `service_name` - Keychain service, e.g. `GeoQuest.auth`
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    /// Store under the configured `keychain_service`.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.keychain_service.trim())
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn create_entry(&self, account: &str) -> std::result::Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {e}"))
        })
    }

    fn get_secret(&self, key: &str) -> std::result::Result<String, KeychainError> {
        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| {
            if matches!(e, keyring::Error::NoEntry) {
                KeychainError::NotFound
            } else {
                KeychainError::AccessFailed(format!("Failed to retrieve secret for {key}: {e}"))
            }
        })
    }

    /// Missing entries read as empty strings.
    fn get_secret_or_empty(&self, key: &str) -> std::result::Result<String, KeychainError> {
        match self.get_secret(key) {
            Ok(secret) => Ok(secret),
            Err(KeychainError::NotFound) => Ok(String::new()),
            Err(other) => Err(other),
        }
    }

    fn set_secret(&self, key: &str, value: &str) -> std::result::Result<(), KeychainError> {
        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {key}: {e}"))
        })
    }

    /// Delete a secret (idempotent).
    fn delete_secret(&self, key: &str) -> std::result::Result<(), KeychainError> {
        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {key}: {e}"
            ))),
        }
    }

    /// Empty values are deleted rather than stored.
    fn put_or_delete(&self, key: &str, value: &str) -> std::result::Result<(), KeychainError> {
        if value.is_empty() {
            self.delete_secret(key)
        } else {
            self.set_secret(key, value)
        }
    }
}

impl Default for KeychainCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEYCHAIN_SERVICE)
    }
}

#[async_trait]
impl CredentialStore for KeychainCredentialStore {
    async fn load(&self) -> Result<Credentials> {
        debug!(service = %self.service_name, "Loading credentials from keychain");
        Ok(Credentials {
            access_token: self.get_secret_or_empty(STORAGE_KEY_ACCESS_TOKEN)?,
            refresh_token: self.get_secret_or_empty(STORAGE_KEY_REFRESH_TOKEN)?,
            user_id: self.get_secret_or_empty(STORAGE_KEY_USER_ID)?,
        })
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        debug!(service = %self.service_name, "Storing credentials in keychain");
        self.put_or_delete(STORAGE_KEY_ACCESS_TOKEN, &credentials.access_token)?;
        self.put_or_delete(STORAGE_KEY_REFRESH_TOKEN, &credentials.refresh_token)?;
        self.put_or_delete(STORAGE_KEY_USER_ID, &credentials.user_id)?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        debug!(service = %self.service_name, "Deleting credentials from keychain");
        // Attempt every key before reporting the first failure.
        let mut first_error = None;
        for key in CREDENTIAL_KEYS {
            if let Err(err) = self.delete_secret(key) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }

    async fn load_device_id(&self) -> Result<Option<String>> {
        let device_id = self.get_secret_or_empty(STORAGE_KEY_DEVICE_ID)?;
        Ok(Some(device_id).filter(|id| !id.is_empty()))
    }

    async fn save_device_id(&self, device_id: &str) -> Result<()> {
        self.set_secret(STORAGE_KEY_DEVICE_ID, device_id)?;
        Ok(())
    }
}
