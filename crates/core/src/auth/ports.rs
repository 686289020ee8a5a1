//! Persistence port for credentials
//!
//! Abstracts where the token triple lives (OS keychain, in-memory) so the
//! token store can be tested without a platform keychain.

use async_trait::async_trait;
use geoquest_domain::{Credentials, Result};

/// Durable storage for the access token, refresh token and user id
///
/// The three values are always written and cleared together. The device id
/// is stored alongside but survives `clear`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read persisted credentials. Missing values come back as empty
    /// strings, not errors.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if the backend cannot be read.
    async fn load(&self) -> Result<Credentials>;

    /// Persist all three values.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if the backend rejects the write.
    async fn save(&self, credentials: &Credentials) -> Result<()>;

    /// Remove all three values (idempotent).
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if the backend rejects the delete.
    async fn clear(&self) -> Result<()>;

    /// Read the persisted per-install device id.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if the backend cannot be read.
    async fn load_device_id(&self) -> Result<Option<String>>;

    /// Persist the per-install device id.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if the backend rejects the write.
    async fn save_device_id(&self, device_id: &str) -> Result<()>;
}
