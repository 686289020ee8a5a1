//! Process-local credential store
//!
//! Used by tests and by platforms without a system keychain (Web builds).
//! Nothing survives a restart.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use geoquest_domain::{Credentials, GeoQuestError, Result};
use parking_lot::Mutex;

use super::ports::CredentialStore;

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Credentials>,
    device_id: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with credentials, as if persisted by an earlier run.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self { credentials: Mutex::new(credentials), ..Self::default() }
    }

    /// Make every subsequent write fail, to exercise storage error paths.
    pub fn fail_writes(&self, enabled: bool) {
        self.fail_writes.store(enabled, Ordering::SeqCst);
    }

    /// Copy of what is currently persisted.
    #[must_use]
    pub fn persisted(&self) -> Credentials {
        self.credentials.lock().clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GeoQuestError::Storage("memory store is read-only".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Credentials> {
        Ok(self.credentials.lock().clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        self.check_writable()?;
        *self.credentials.lock() = credentials.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check_writable()?;
        *self.credentials.lock() = Credentials::default();
        Ok(())
    }

    async fn load_device_id(&self) -> Result<Option<String>> {
        Ok(self.device_id.lock().clone())
    }

    async fn save_device_id(&self, device_id: &str) -> Result<()> {
        self.check_writable()?;
        *self.device_id.lock() = Some(device_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clear_keeps_device_id() {
        let store = MemoryCredentialStore::new();
        store.save(&Credentials::new(Some("a"), Some("r"), Some("u"))).await.unwrap();
        store.save_device_id("device-1").await.unwrap();

        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.load_device_id().await.unwrap().as_deref(), Some("device-1"));
    }

    #[tokio::test]
    async fn failing_writes_surface_storage_errors() {
        let store = MemoryCredentialStore::new();
        store.fail_writes(true);
        let result = store.save(&Credentials::default()).await;
        assert!(matches!(result, Err(GeoQuestError::Storage(_))));
    }
}
