use std::time::Duration;

use geoquest_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use geoquest_domain::GeoQuestError;
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use tracing::debug;

use crate::errors::{InfraError, TransportError};

/// Status line and body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Canonical reason phrase, e.g. `Bad Gateway`.
    pub reason: String,
    pub body: String,
}

/// HTTP client with per-request timeouts and fixed default headers.
///
/// It never retries: every replay decision belongs to the pipeline.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
    timeout: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute the request and buffer the whole body.
    ///
    /// Any status is a successful exchange; only transport problems are
    /// errors. `timeout` overrides the client default for this request.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the request cannot be built, sent or
    /// read back.
    pub async fn send(
        &self,
        builder: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<TransportResponse, TransportError> {
        let timeout = timeout.unwrap_or(self.timeout);
        let request = builder
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::from_reqwest(&err, timeout))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, path = %url.path(), "sending HTTP request");

        let response = self.client.execute(request).await.map_err(|err| {
            debug!(%method, path = %url.path(), error = %err, "HTTP request failed");
            TransportError::from_reqwest(&err, timeout)
        })?;

        let status = response.status();
        debug!(%method, path = %url.path(), %status, "received HTTP response");

        let body =
            response.text().await.map_err(|err| TransportError::from_reqwest(&err, timeout))?;
        Ok(TransportResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown status").to_string(),
            body,
        })
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    #[must_use]
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// # Errors
    /// Returns `GeoQuestError::Config` if the TLS backend cannot be set up.
    pub fn build(self) -> Result<HttpClient, GeoQuestError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| GeoQuestError::from(InfraError::from(err)))?;

        Ok(HttpClient { client, timeout: self.timeout })
    }
}
