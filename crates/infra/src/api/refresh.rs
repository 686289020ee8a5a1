//! Single-flight token refresh
//!
//! The first caller starts the exchange on its own task and publishes a
//! shared handle to it; everyone arriving while it runs awaits that same
//! handle. The handle is removed by the task itself once it finishes, so a
//! refresh that fails (or panics) never wedges later callers.
//!
//! Every finished exchange bumps a generation counter under the slot lock.
//! A caller recovering from a 401 that finds the slot empty but the
//! generation moved knows a refresh settled after its request went out and
//! does not start another one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use geoquest_core::{ResponseNormalizer, TokenStore};
use geoquest_domain::constants::REFRESH_PATH;
use geoquest_domain::{Credentials, TokenPayload};
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::join_url;
use crate::http::HttpClient;

type SharedRefresh = Shared<BoxFuture<'static, bool>>;

#[derive(Default)]
struct InFlight {
    slot: Mutex<Option<SharedRefresh>>,
    /// Number of exchanges that have finished.
    generation: AtomicU64,
}

pub struct RefreshCoordinator {
    exchange: RefreshExchange,
    in_flight: Arc<InFlight>,
}

impl RefreshCoordinator {
    pub fn new(
        http: HttpClient,
        base_url: &str,
        store: Arc<TokenStore>,
        timeout: Duration,
    ) -> Self {
        let url = join_url(base_url, REFRESH_PATH);
        Self {
            exchange: RefreshExchange { http, url, store, timeout },
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// Joins a refresh that is already running instead of starting a second
    /// one. Returns whether the store is authenticated afterwards.
    pub async fn refresh(&self) -> bool {
        self.settle(self.join_or_start(None)).await
    }

    /// Recover from a 401 on a request that carried `rejected_token`.
    ///
    /// If the store already holds a different, valid access token (another
    /// caller refreshed after this request left) no new exchange is made.
    /// The same holds when an exchange finishes between that check and
    /// joining the slot.
    pub async fn refresh_after_rejection(&self, rejected_token: Option<&str>) -> bool {
        let seen = self.generation();
        let store = &self.exchange.store;
        if let Some(current) = store.access_token().await {
            if rejected_token != Some(current.as_str()) && store.is_authenticated().await {
                debug!("access token rotated since the request was sent; skipping refresh");
                return true;
            }
        }
        self.settle(self.join_or_start(Some(seen))).await
    }

    /// Drop the session after the server refused it for good.
    pub async fn invalidate(&self) {
        if let Err(err) = self.exchange.store.expire().await {
            warn!(error = %err, "session invalidated but persisted tokens remain");
        }
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.slot.lock().is_some()
    }

    /// How many exchanges have finished so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.in_flight.generation.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.exchange.store
    }

    /// Join the running exchange or start one.
    ///
    /// With `settled_since`, returns `None` instead of starting when an
    /// exchange has finished since that generation was read.
    fn join_or_start(&self, settled_since: Option<u64>) -> Option<SharedRefresh> {
        let mut slot = self.in_flight.slot.lock();
        if let Some(running) = slot.as_ref() {
            debug!("token refresh already in flight; waiting for it");
            return Some(running.clone());
        }
        if settled_since.is_some_and(|seen| seen != self.generation()) {
            debug!("token refresh settled after the request was sent; not starting another");
            return None;
        }

        let started = self.start();
        *slot = Some(started.clone());
        Some(started)
    }

    async fn settle(&self, flight: Option<SharedRefresh>) -> bool {
        match flight {
            Some(flight) => flight.await,
            None => self.exchange.store.is_authenticated().await,
        }
    }

    /// Must be called with the slot locked.
    fn start(&self) -> SharedRefresh {
        let exchange = self.exchange.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let task = tokio::spawn(async move {
            let _release = InFlightGuard(in_flight);
            exchange.run().await
        });

        async move {
            task.await.unwrap_or_else(|err| {
                error!(error = %err, "token refresh task aborted");
                false
            })
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("url", &self.exchange.url)
            .field("timeout", &self.exchange.timeout)
            .field("in_flight", &self.is_refreshing())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Empties the in-flight slot when the refresh task ends, however it ends.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut slot = self.0.slot.lock();
        self.0.generation.fetch_add(1, Ordering::AcqRel);
        slot.take();
    }
}

#[derive(Clone)]
struct RefreshExchange {
    http: HttpClient,
    url: String,
    store: Arc<TokenStore>,
    timeout: Duration,
}

impl RefreshExchange {
    async fn run(self) -> bool {
        let Some(refresh_token) = self.store.refresh_token().await else {
            warn!("token refresh requested without a refresh token");
            self.discard().await;
            return false;
        };

        info!(token_len = refresh_token.len(), "Refreshing access token");
        let builder = self
            .http
            .request(Method::POST, &self.url)
            .json(&json!({ "refreshToken": refresh_token }));

        let renewed = match self.http.send(builder, Some(self.timeout)).await {
            Ok(response) if (200..300).contains(&response.status) => {
                self.parse_renewal(&response.body).await
            }
            Ok(response) => {
                warn!(status = response.status, "token refresh rejected");
                None
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                None
            }
        };

        match renewed {
            Some(credentials) => {
                // The store logs persistence failures; memory is updated regardless.
                let _ = self.store.set_credentials(credentials).await;
                info!("Access token refreshed");
            }
            None => self.discard().await,
        }

        self.store.is_authenticated().await
    }

    async fn parse_renewal(&self, body: &str) -> Option<Credentials> {
        let envelope = ResponseNormalizer::success_body::<Value>(body);
        if !envelope.success {
            warn!(error = ?envelope.error, "token refresh returned an unusable body");
            return None;
        }

        let payload = envelope.data.as_ref().and_then(TokenPayload::from_data);
        let fallback_user_id = self.store.user_id().await;
        let Some(credentials) =
            payload.and_then(|payload| payload.into_credentials(&fallback_user_id))
        else {
            warn!("token refresh response did not carry a token pair");
            return None;
        };

        if self.store.is_expired(&credentials.access_token) {
            warn!(
                token_len = credentials.access_token.len(),
                "token refresh returned an access token that is already expired"
            );
            return None;
        }
        Some(credentials)
    }

    async fn discard(&self) {
        if let Err(err) = self.store.expire().await {
            warn!(error = %err, "failed to clear tokens after unsuccessful refresh");
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use geoquest_core::{MemoryCredentialStore, SessionEvent, SessionEvents};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn store_with(access: &str, refresh: &str) -> Arc<TokenStore> {
        let store =
            Arc::new(TokenStore::new(Arc::new(MemoryCredentialStore::new()), SessionEvents::new()));
        store.set(Some(access), Some(refresh), Some("player-1")).await.unwrap();
        store
    }

    fn jwt_expiring_in(secs: i64) -> String {
        let claims = json!({ "sub": "player-1", "exp": chrono::Utc::now().timestamp() + secs });
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    fn coordinator(server: &MockServer, store: Arc<TokenStore>) -> RefreshCoordinator {
        let http = HttpClient::builder().build().unwrap();
        RefreshCoordinator::new(http, &server.uri(), store, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn successful_refresh_replaces_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(json!({"refreshToken": "refresh-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"accessToken": "access-2", "refreshToken": "refresh-2"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_with("access-1", "refresh-1").await;
        let coordinator = coordinator(&server, store.clone());

        assert!(coordinator.refresh().await);
        assert_eq!(store.access_token().await.as_deref(), Some("access-2"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("refresh-2"));
        assert_eq!(store.user_id().await, "player-1");
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn rejected_refresh_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_with("access-1", "refresh-1").await;
        assert!(!coordinator(&server, store.clone()).refresh().await);
        assert!(!store.has_credentials().await);
    }

    #[tokio::test]
    async fn malformed_payload_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": {"accessToken": "only"}})),
            )
            .mount(&server)
            .await;

        let store = store_with("access-1", "refresh-1").await;
        assert!(!coordinator(&server, store.clone()).refresh().await);
        assert!(!store.has_credentials().await);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(200))
                    .set_body_json(json!({"accessToken": "access-2", "refreshToken": "refresh-2"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = store_with("access-1", "refresh-1").await;
        let coordinator = coordinator(&server, store.clone());

        let results = futures::future::join_all((0..8).map(|_| coordinator.refresh())).await;

        assert!(results.into_iter().all(|ok| ok));
        assert_eq!(store.access_token().await.as_deref(), Some("access-2"));
    }

    #[tokio::test]
    async fn rotated_token_skips_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let store = store_with("access-2", "refresh-2").await;
        let coordinator = coordinator(&server, store);

        assert!(coordinator.refresh_after_rejection(Some("access-1")).await);
    }

    #[tokio::test]
    async fn later_refreshes_start_a_new_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "access-n", "refreshToken": "refresh-n"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let store = store_with("access-1", "refresh-1").await;
        let coordinator = coordinator(&server, store);

        assert!(coordinator.refresh().await);
        assert!(coordinator.refresh().await);
    }

    #[tokio::test]
    async fn already_expired_renewal_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": jwt_expiring_in(-60), "refreshToken": "refresh-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = Arc::new(MemoryCredentialStore::new());
        let events = SessionEvents::new();
        let store = Arc::new(TokenStore::new(storage.clone(), events.clone()));
        store.set(Some("access-1"), Some("refresh-1"), Some("player-1")).await.unwrap();
        let mut rx = events.subscribe();

        assert!(!coordinator(&server, store.clone()).refresh().await);

        assert!(!store.has_credentials().await);
        assert!(storage.persisted().is_empty());
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::TokenExpired);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn settled_refresh_is_not_restarted_by_late_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "access-2", "refreshToken": "refresh-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_with("access-1", "refresh-1").await;
        let coordinator = coordinator(&server, store.clone());
        let seen = coordinator.generation();

        assert!(coordinator.refresh().await);
        assert_eq!(coordinator.generation(), seen + 1);

        assert!(coordinator.join_or_start(Some(seen)).is_none());
        assert!(coordinator.settle(coordinator.join_or_start(Some(seen))).await);
        assert!(!coordinator.is_refreshing());
        assert_eq!(store.refresh_token().await.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn invalidate_expires_without_logging_out() {
        let storage = Arc::new(MemoryCredentialStore::new());
        let events = SessionEvents::new();
        let store = Arc::new(TokenStore::new(storage, events.clone()));
        store.set(Some("access-1"), Some("refresh-1"), Some("player-1")).await.unwrap();
        let mut rx = events.subscribe();
        let http = HttpClient::builder().build().unwrap();
        let coordinator = RefreshCoordinator::new(
            http,
            "http://127.0.0.1:9",
            store.clone(),
            Duration::from_secs(1),
        );

        coordinator.invalidate().await;

        assert!(!store.has_credentials().await);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::TokenExpired);
        assert!(rx.try_recv().is_err());
    }
}
