#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use geoquest_core::{MemoryCredentialStore, SessionEvent};
use geoquest_domain::{ClientConfig, Credentials, Platform};
use geoquest_infra::{AuthApi, RequestPipeline};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use wiremock::MockServer;

pub const DEVICE_ID: &str = "device-test-0001";

/// Compact JWT whose `exp` lies `expires_in` seconds from now.
pub fn jwt(subject: &str, expires_in: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({ "sub": subject, "exp": Utc::now().timestamp() + expires_in });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

pub fn live_token(subject: &str) -> String {
    jwt(subject, 3600)
}

pub fn expired_token(subject: &str) -> String {
    jwt(subject, -3600)
}

pub fn session(access: &str, refresh: &str) -> Credentials {
    Credentials::new(Some(access), Some(refresh), Some("player-1"))
}

pub fn envelope(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

/// Pipeline wired to a mock server through the real `connect` path.
pub struct TestApp {
    pub server: MockServer,
    pub storage: Arc<MemoryCredentialStore>,
    pub pipeline: Arc<RequestPipeline>,
}

impl TestApp {
    pub async fn start(credentials: Credentials) -> Self {
        let server = MockServer::start().await;
        let mut config = ClientConfig::with_base_url(format!("{}/api/v1", server.uri()));
        config.platform = Platform::Android;
        config.device_id = Some(DEVICE_ID.to_string());
        config.request_timeout_secs = 5;
        config.refresh_timeout_secs = 5;

        let storage = Arc::new(MemoryCredentialStore::with_credentials(credentials));
        let pipeline = RequestPipeline::connect(&config, storage.clone())
            .await
            .expect("pipeline should build from test config");

        Self { server, storage, pipeline: Arc::new(pipeline) }
    }

    pub async fn logged_out() -> Self {
        Self::start(Credentials::default()).await
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.pipeline.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.pipeline.events().subscribe()
    }
}

/// Everything published so far, without waiting.
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
