//! Token store - the single source of truth for credentials
//!
//! Holds the access token, refresh token and user id in memory, mirrors
//! them to a [`CredentialStore`], and answers expiry questions.
//!
//! Writers are limited to the refresh coordinator and the login/logout
//! entry points. Everything else only reads.

use std::sync::Arc;

use geoquest_domain::constants::DEFAULT_EXPIRY_SKEW_SECS;
use geoquest_domain::{Credentials, Result};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::jwt;
use super::ports::CredentialStore;
use crate::session::{SessionEvent, SessionEvents};

pub struct TokenStore {
    storage: Arc<dyn CredentialStore>,
    current: RwLock<Credentials>,
    events: SessionEvents,
    skew_secs: i64,
}

impl TokenStore {
    /// Create an empty store. Call [`TokenStore::load`] once at startup.
    pub fn new(storage: Arc<dyn CredentialStore>, events: SessionEvents) -> Self {
        Self::with_skew(storage, events, DEFAULT_EXPIRY_SKEW_SECS)
    }

    pub fn with_skew(
        storage: Arc<dyn CredentialStore>,
        events: SessionEvents,
        skew_secs: i64,
    ) -> Self {
        Self { storage, current: RwLock::new(Credentials::default()), events, skew_secs }
    }

    /// Load persisted credentials into memory.
    ///
    /// If the loaded access token is already expired the whole session is
    /// wiped, so a present access token always means "plausibly usable".
    ///
    /// # Returns
    /// `true` if a usable session was restored
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if the backend cannot be read or the
    /// expired session cannot be wiped.
    pub async fn load(&self) -> Result<bool> {
        let loaded = self.storage.load().await?;

        if loaded.has_access_token() && self.is_expired(&loaded.access_token) {
            info!(
                token_len = loaded.access_token.len(),
                "persisted access token expired; clearing session"
            );
            self.clear().await?;
            return Ok(false);
        }

        let restored = loaded.has_access_token();
        *self.current.write().await = loaded;

        if restored {
            info!("Token store initialized with existing session");
        } else {
            debug!("No persisted session found");
        }
        Ok(restored)
    }

    /// Store new credentials. Missing values are coerced to empty strings.
    ///
    /// Memory is updated before persistence, so the in-process session
    /// reflects the new tokens even when the write fails.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if persisting fails.
    pub async fn set(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<()> {
        self.set_credentials(Credentials::new(access_token, refresh_token, user_id)).await
    }

    /// [`TokenStore::set`] with an already-built triple.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if persisting fails.
    pub async fn set_credentials(&self, credentials: Credentials) -> Result<()> {
        if !credentials.has_access_token() || !credentials.has_refresh_token() {
            warn!(
                access_token_len = credentials.access_token.len(),
                refresh_token_len = credentials.refresh_token.len(),
                "tokens stored with an empty value"
            );
        }

        *self.current.write().await = credentials.clone();
        let persisted = self.storage.save(&credentials).await;
        if let Err(err) = &persisted {
            error!(error = %err, "failed to persist tokens");
        }

        info!(user_id = %credentials.user_id, "Tokens stored");
        self.events.publish(SessionEvent::TokensUpdated { user_id: credentials.user_id });
        persisted
    }

    /// Wipe all three values from memory and storage.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if the persisted copy cannot be
    /// removed. Memory is cleared regardless.
    pub async fn clear(&self) -> Result<()> {
        *self.current.write().await = Credentials::default();
        let cleared = self.storage.clear().await;
        if let Err(err) = &cleared {
            error!(error = %err, "failed to clear persisted tokens");
        }

        info!("Tokens cleared (logged out)");
        self.events.publish(SessionEvent::LoggedOut);
        cleared
    }

    /// Drop a session the server no longer accepts.
    ///
    /// Same wipe as [`TokenStore::clear`], but announced as
    /// [`SessionEvent::TokenExpired`] instead of `LoggedOut`. An already
    /// empty store is left alone and nothing is published.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if the persisted copy cannot be
    /// removed. Memory is cleared regardless.
    pub async fn expire(&self) -> Result<()> {
        let held = std::mem::take(&mut *self.current.write().await);
        if held.is_empty() {
            debug!("expire requested with no session held");
            return Ok(());
        }

        let cleared = self.storage.clear().await;
        if let Err(err) = &cleared {
            error!(error = %err, "failed to clear persisted tokens");
        }

        info!(user_id = %held.user_id, "Session expired; tokens cleared");
        self.events.publish(SessionEvent::TokenExpired);
        cleared
    }

    /// Access token present and not expired.
    pub async fn is_authenticated(&self) -> bool {
        let current = self.current.read().await;
        current.has_access_token() && !self.is_expired(&current.access_token)
    }

    /// Whether any credentials are held at all (expired or not).
    pub async fn has_credentials(&self) -> bool {
        let current = self.current.read().await;
        current.has_access_token() || current.has_refresh_token()
    }

    pub async fn access_token(&self) -> Option<String> {
        let current = self.current.read().await;
        current.has_access_token().then(|| current.access_token.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        let current = self.current.read().await;
        current.has_refresh_token().then(|| current.refresh_token.clone())
    }

    pub async fn user_id(&self) -> String {
        self.current.read().await.user_id.clone()
    }

    pub async fn snapshot(&self) -> Credentials {
        self.current.read().await.clone()
    }

    /// Expiry check with this store's skew. Fails open.
    #[must_use]
    pub fn is_expired(&self, token: &str) -> bool {
        jwt::is_expired(token, self.skew_secs)
    }

    #[must_use]
    pub const fn skew_secs(&self) -> i64 {
        self.skew_secs
    }

    #[must_use]
    pub const fn events(&self) -> &SessionEvents {
        &self.events
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").field("skew_secs", &self.skew_secs).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::Utc;
    use geoquest_domain::GeoQuestError;
    use serde_json::json;

    use super::*;
    use crate::auth::MemoryCredentialStore;

    fn jwt_expiring_in(secs: i64) -> String {
        let payload = json!({"sub": "player", "exp": Utc::now().timestamp() + secs});
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    fn store_over(storage: Arc<MemoryCredentialStore>) -> TokenStore {
        TokenStore::new(storage, SessionEvents::new())
    }

    #[tokio::test]
    async fn starts_unauthenticated() {
        let store = store_over(Arc::new(MemoryCredentialStore::new()));
        assert!(!store.is_authenticated().await);
        assert!(!store.has_credentials().await);
        assert_eq!(store.access_token().await, None);
    }

    #[tokio::test]
    async fn set_persists_and_authenticates() {
        let storage = Arc::new(MemoryCredentialStore::new());
        let store = store_over(storage.clone());
        let access = jwt_expiring_in(3_600);

        store.set(Some(&access), Some("refresh"), Some("player-1")).await.unwrap();

        assert!(store.is_authenticated().await);
        assert_eq!(storage.persisted().access_token, access);
        assert_eq!(store.user_id().await, "player-1");
    }

    #[tokio::test]
    async fn opaque_access_token_counts_as_authenticated() {
        let store = store_over(Arc::new(MemoryCredentialStore::new()));
        store.set(Some("opaque"), Some("refresh"), None).await.unwrap();
        assert!(store.is_authenticated().await);
    }

    #[tokio::test]
    async fn expired_access_token_is_not_authenticated() {
        let store = store_over(Arc::new(MemoryCredentialStore::new()));
        store.set(Some(&jwt_expiring_in(-60)), Some("refresh"), None).await.unwrap();

        assert!(!store.is_authenticated().await);
        assert!(store.has_credentials().await);
    }

    #[tokio::test]
    async fn token_inside_skew_window_is_expired() {
        let store = store_over(Arc::new(MemoryCredentialStore::new()));
        store.set(Some(&jwt_expiring_in(5)), Some("refresh"), None).await.unwrap();
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn set_emits_tokens_updated() {
        let events = SessionEvents::new();
        let mut rx = events.subscribe();
        let store = TokenStore::new(Arc::new(MemoryCredentialStore::new()), events);

        store.set(Some("a"), Some("r"), Some("u-9")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), SessionEvent::TokensUpdated { user_id: "u-9".into() });
    }

    #[tokio::test]
    async fn clear_wipes_memory_and_storage() {
        let events = SessionEvents::new();
        let mut rx = events.subscribe();
        let storage = Arc::new(MemoryCredentialStore::new());
        let store = TokenStore::new(storage.clone(), events);
        store.set(Some("a"), Some("r"), Some("u")).await.unwrap();
        let _ = rx.recv().await;

        store.clear().await.unwrap();

        assert!(!store.has_credentials().await);
        assert!(storage.persisted().is_empty());
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::LoggedOut);
    }

    #[tokio::test]
    async fn expire_announces_token_expired_only() {
        let events = SessionEvents::new();
        let storage = Arc::new(MemoryCredentialStore::new());
        let store = TokenStore::new(storage.clone(), events.clone());
        store.set(Some("a"), Some("r"), Some("u")).await.unwrap();
        let mut rx = events.subscribe();

        store.expire().await.unwrap();
        store.expire().await.unwrap();

        assert!(!store.has_credentials().await);
        assert!(storage.persisted().is_empty());
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::TokenExpired);
        assert!(rx.try_recv().is_err(), "second expire on an empty store is silent");
    }

    #[tokio::test]
    async fn clear_empties_memory_even_when_storage_fails() {
        let storage = Arc::new(MemoryCredentialStore::new());
        let store = store_over(storage.clone());
        store.set(Some("a"), Some("r"), Some("u")).await.unwrap();
        storage.fail_writes(true);

        let result = store.clear().await;

        assert!(matches!(result, Err(GeoQuestError::Storage(_))));
        assert!(!store.has_credentials().await);
    }

    #[tokio::test]
    async fn load_restores_valid_session() {
        let access = jwt_expiring_in(3_600);
        let storage = Arc::new(MemoryCredentialStore::with_credentials(Credentials::new(
            Some(&access),
            Some("refresh"),
            Some("player-2"),
        )));
        let store = store_over(storage);

        assert!(store.load().await.unwrap());
        assert!(store.is_authenticated().await);
        assert_eq!(store.refresh_token().await.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn load_clears_session_with_expired_access_token() {
        let storage = Arc::new(MemoryCredentialStore::with_credentials(Credentials::new(
            Some(&jwt_expiring_in(-3_600)),
            Some("still-valid-refresh"),
            Some("player-3"),
        )));
        let store = store_over(storage.clone());

        assert!(!store.load().await.unwrap());
        assert!(!store.has_credentials().await);
        assert!(storage.persisted().is_empty());
    }

    #[tokio::test]
    async fn load_with_nothing_persisted() {
        let store = store_over(Arc::new(MemoryCredentialStore::new()));
        assert!(!store.load().await.unwrap());
    }

    #[test]
    fn debug_does_not_expose_credentials() {
        let store = store_over(Arc::new(MemoryCredentialStore::new()));
        assert!(format!("{store:?}").contains("skew_secs"));
    }
}
