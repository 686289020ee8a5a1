//! Request pipeline
//!
//! Executes one logical call end to end and always answers with a
//! [`ResponseEnvelope`]; nothing here returns `Err` to the caller.
//!
//! A 401 on a protected route is recovered at most once: the refresh
//! coordinator renews the pair and the call is replayed with `is_retry`
//! set. A second 401 is final.

use std::sync::Arc;
use std::time::Duration;

use geoquest_core::{
    CredentialStore, EndpointClassifier, ErrorClassifier, ResponseNormalizer, SessionEvent,
    SessionEvents, StatusClass, TokenStore, TransportFailure,
};
use geoquest_domain::constants::{CONTENT_TYPE_JSON, HEADER_DEVICE_ID, HEADER_PLATFORM};
use geoquest_domain::{
    ClientConfig, EndpointAuthPolicy, ErrorCode, GeoQuestError, HttpMethod, RequestDescriptor,
    ResponseEnvelope, Result,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::join_url;
use super::refresh::RefreshCoordinator;
use crate::auth::{DeviceIdentity, KeychainCredentialStore};
use crate::http::{HttpClient, TransportResponse};

/// Outcome of a single transport attempt
enum Step<T> {
    Done(ResponseEnvelope<T>),
    RetryAfterRefresh,
}

pub struct RequestPipeline {
    http: HttpClient,
    base_url: String,
    device_id: String,
    timeout: Duration,
    store: Arc<TokenStore>,
    classifier: EndpointClassifier,
    coordinator: RefreshCoordinator,
    events: SessionEvents,
}

impl RequestPipeline {
    /// Build a pipeline over an already-loaded token store.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Config` if the configuration is invalid or
    /// the device id cannot be sent as a header.
    pub fn new(config: &ClientConfig, store: Arc<TokenStore>, device_id: String) -> Result<Self> {
        config.validate()?;
        let base = Url::parse(config.base_url.trim())
            .map_err(|e| GeoQuestError::Config(format!("invalid base_url: {e}")))?;
        let base_url = base.as_str().trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(CONTENT_TYPE_JSON));
        insert_header(&mut headers, HEADER_PLATFORM, config.platform.as_str())?;
        insert_header(&mut headers, HEADER_DEVICE_ID, &device_id)?;

        let mut builder =
            HttpClient::builder().timeout(config.request_timeout()).default_headers(headers);
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let http = builder.build()?;

        let coordinator = RefreshCoordinator::new(
            http.clone(),
            &base_url,
            store.clone(),
            config.refresh_timeout(),
        );

        info!(base_url = %base_url, platform = %config.platform, "Request pipeline ready");

        Ok(Self {
            http,
            base_url,
            device_id,
            timeout: config.request_timeout(),
            events: store.events().clone(),
            store,
            classifier: EndpointClassifier::new(),
            coordinator,
        })
    }

    /// Wire up everything from configuration and a credential backend:
    /// device identity, token store (loaded from storage) and pipeline.
    ///
    /// A backend that cannot be read starts the process logged out.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Config` if the configuration is invalid.
    pub async fn connect(
        config: &ClientConfig,
        storage: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        config.validate()?;
        let device_id = DeviceIdentity::resolve(config, storage.as_ref()).await;
        let store = Arc::new(TokenStore::with_skew(
            storage,
            SessionEvents::new(),
            config.expiry_skew_secs,
        ));
        if let Err(err) = store.load().await {
            warn!(error = %err, "could not restore persisted session");
        }
        Self::new(config, store, device_id)
    }

    /// [`RequestPipeline::connect`] over the OS keychain named by
    /// `config.keychain_service`.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Config` if the configuration is invalid.
    pub async fn connect_keychain(config: &ClientConfig) -> Result<Self> {
        let storage = KeychainCredentialStore::from_config(config);
        debug!(service = %storage.service_name(), "using OS keychain for credentials");
        Self::connect(config, Arc::new(storage)).await
    }

    /// Send one logical request and return a typed envelope.
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    pub async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<Value>,
    ) -> ResponseEnvelope<T> {
        let mut request = RequestDescriptor::new(path, method, body);
        loop {
            match self.attempt(&request).await {
                Step::Done(envelope) => return envelope,
                Step::RetryAfterRefresh => {
                    debug!(request = %request.key(), "replaying request after token refresh");
                    request.is_retry = true;
                }
            }
        }
    }

    /// [`RequestPipeline::send`] with the verb given as text, e.g. `"patch"`.
    ///
    /// Unknown verbs yield `INVALID_METHOD` without touching the network.
    pub async fn send_raw<T: DeserializeOwned>(
        &self,
        path: &str,
        method: &str,
        body: Option<Value>,
    ) -> ResponseEnvelope<T> {
        match method.parse::<HttpMethod>() {
            Ok(method) => self.send(path, method, body).await,
            Err(reason) => {
                warn!(path = %path, method = %method, "rejecting unsupported HTTP method");
                ResponseEnvelope::failure(ErrorCode::InvalidMethod).with_message(reason)
            }
        }
    }

    /// Send, then bind `data` to `T`; a payload of the wrong shape becomes
    /// a failure carrying `shape_error`.
    pub async fn send_as<T: DeserializeOwned>(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<Value>,
        shape_error: ErrorCode,
    ) -> ResponseEnvelope<T> {
        self.send::<Value>(path, method, body).await.narrow(shape_error)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ResponseEnvelope<T> {
        self.send(path, HttpMethod::Get, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> ResponseEnvelope<T> {
        self.send(path, HttpMethod::Post, body).await
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    #[must_use]
    pub const fn events(&self) -> &SessionEvents {
        &self.events
    }

    #[must_use]
    pub const fn classifier(&self) -> &EndpointClassifier {
        &self.classifier
    }

    #[must_use]
    pub const fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn attempt<T: DeserializeOwned>(&self, request: &RequestDescriptor) -> Step<T> {
        let policy = self.classifier.policy(&request.path);
        if policy.requires_authentication() && !self.store.is_authenticated().await {
            self.classifier.note_skipped(request.method, &request.path);
            return Step::Done(
                ResponseEnvelope::failure(ErrorCode::AuthRequired)
                    .with_message(format!("authentication required for {}", request.key())),
            );
        }

        let sent_token = self.store.access_token().await;
        let url = join_url(&self.base_url, &request.path);
        let mut builder = self.http.request(to_reqwest(request.method), url);
        if let Some(token) = &sent_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.wire_body() {
            builder = builder.json(&body);
        }

        let response = match self.http.send(builder, Some(self.timeout)).await {
            Ok(response) => response,
            Err(err) => {
                let envelope = ErrorClassifier::transport_failure(&TransportFailure::from(err));
                self.report_failure(request, &envelope);
                return Step::Done(envelope);
            }
        };

        match ErrorClassifier::classify_status(response.status) {
            StatusClass::Success => {
                let envelope = ResponseNormalizer::success_body(&response.body);
                if !envelope.success {
                    warn!(
                        request = %request.key(),
                        error = ?envelope.error,
                        "successful response could not be decoded"
                    );
                }
                Step::Done(envelope)
            }
            StatusClass::NoContent => Step::Done(ResponseEnvelope::ok(None)),
            StatusClass::Unauthorized => {
                self.on_unauthorized(request, policy, sent_token.as_deref(), &response).await
            }
            StatusClass::Forbidden => {
                warn!(request = %request.key(), "access denied");
                self.events.publish(SessionEvent::AccessDenied {
                    path: EndpointClassifier::normalize_path(&request.path),
                });
                Step::Done(ErrorClassifier::with_code(ErrorCode::AccessDenied, &response.body))
            }
            StatusClass::Failure => {
                let envelope = ErrorClassifier::http_failure(
                    response.status,
                    &response.reason,
                    &response.body,
                );
                self.report_failure(request, &envelope);
                Step::Done(envelope)
            }
        }
    }

    async fn on_unauthorized<T>(
        &self,
        request: &RequestDescriptor,
        policy: EndpointAuthPolicy,
        sent_token: Option<&str>,
        response: &TransportResponse,
    ) -> Step<T> {
        if !policy.requires_authentication() {
            debug!(request = %request.key(), "public route answered 401");
            return Step::Done(ErrorClassifier::with_code(ErrorCode::Unauthorized, &response.body));
        }

        if request.is_retry {
            warn!(request = %request.key(), "rejected again after token refresh");
            self.coordinator.invalidate().await;
            return Step::Done(ErrorClassifier::with_code(ErrorCode::Unauthorized, &response.body));
        }

        let held = self.store.snapshot().await;
        if held.has_refresh_token() {
            if self.coordinator.refresh_after_rejection(sent_token).await {
                return Step::RetryAfterRefresh;
            }
            info!(request = %request.key(), "token refresh failed; session expired");
            // The exchange expires the session itself; this covers an aborted task.
            if self.store.has_credentials().await {
                self.coordinator.invalidate().await;
            }
            return Step::Done(expired());
        }

        if held.has_access_token() {
            info!(request = %request.key(), "access token rejected and no refresh token held");
            self.coordinator.invalidate().await;
            return Step::Done(expired());
        }

        Step::Done(ErrorClassifier::with_code(ErrorCode::Unauthorized, &response.body))
    }

    fn report_failure<T>(&self, request: &RequestDescriptor, envelope: &ResponseEnvelope<T>) {
        let description = ErrorClassifier::describe(envelope);
        warn!(
            request = %request.key(),
            error = ?envelope.error,
            detail = %description,
            "request failed"
        );
        let diagnostic = format!("{} -> {description}", request.key());
        self.events.publish(SessionEvent::RequestError(diagnostic));
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn expired<T>() -> ResponseEnvelope<T> {
    ResponseEnvelope::failure(ErrorCode::TokenExpired)
        .with_message("session expired; sign in again")
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| GeoQuestError::Config(format!("invalid header name {name}: {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| GeoQuestError::Config(format!("invalid {name} header {value:?}: {e}")))?;
    headers.insert(name, value);
    Ok(())
}

fn to_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}
