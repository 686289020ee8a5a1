//! Login, registration and logout entry points
//!
//! Together with the refresh coordinator these are the only places that
//! write to the token store.

use std::sync::Arc;

use geoquest_domain::constants::{GUEST_LOGIN_PATH, LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH};
use geoquest_domain::{ErrorCode, ResponseEnvelope, Result, TokenPayload};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::pipeline::RequestPipeline;

/// Authentication service over the request pipeline
#[derive(Debug, Clone)]
pub struct AuthApi {
    pipeline: Arc<RequestPipeline>,
}

impl AuthApi {
    pub const fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    /// Sign in with email and password.
    ///
    /// On success the returned token pair is stored exactly once and the
    /// envelope (with the full `data`, user included) is handed back.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> ResponseEnvelope<Value> {
        self.authenticate(LOGIN_PATH, json!({ "email": email, "password": password })).await
    }

    #[instrument(skip_all)]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ResponseEnvelope<Value> {
        let body = json!({ "username": username, "email": email, "password": password });
        self.authenticate(REGISTER_PATH, body).await
    }

    /// Anonymous session bound to this install's device id.
    #[instrument(skip(self))]
    pub async fn guest_login(&self) -> ResponseEnvelope<Value> {
        let body = json!({ "deviceId": self.pipeline.device_id() });
        self.authenticate(GUEST_LOGIN_PATH, body).await
    }

    /// Tell the server (best effort) and wipe local credentials.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Storage` if the persisted tokens could not be
    /// removed; the in-memory session is gone either way.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let store = self.pipeline.store();
        if store.is_authenticated().await {
            let response = self.pipeline.post::<Value>(LOGOUT_PATH, None).await;
            if !response.success {
                debug!(error = ?response.error, "server-side logout failed; clearing anyway");
            }
        }
        store.clear().await?;
        info!("Logged out");
        Ok(())
    }

    #[must_use]
    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    async fn authenticate(&self, path: &str, body: Value) -> ResponseEnvelope<Value> {
        let envelope = self.pipeline.post::<Value>(path, Some(body)).await;
        if !envelope.success {
            return envelope;
        }

        let credentials = envelope
            .data
            .as_ref()
            .and_then(TokenPayload::from_data)
            .and_then(|payload| payload.into_credentials(""));
        let Some(credentials) = credentials else {
            warn!(path = %path, "auth response did not carry a token pair");
            return ResponseEnvelope::failure(ErrorCode::ParseError)
                .with_message("authentication response did not contain tokens");
        };

        if let Err(err) = self.pipeline.store().set_credentials(credentials).await {
            warn!(error = %err, "signed in but tokens could not be persisted");
        }
        envelope
    }
}
