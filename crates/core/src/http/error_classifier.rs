//! Error classification
//!
//! Maps transport outcomes and HTTP statuses onto the closed
//! [`ErrorCode`] taxonomy. Nothing here touches the network; the pipeline
//! feeds it what the transport reported.

use std::fmt;
use std::time::Duration;

use geoquest_domain::{ErrorCode, ResponseEnvelope};

use super::normalizer::ResponseNormalizer;

/// Why a request never produced an HTTP status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout(Duration),
    Connect(String),
    Other(String),
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(after) => write!(f, "request timed out after {}s", after.as_secs()),
            Self::Connect(detail) => write!(f, "connection failed: {detail}"),
            Self::Other(detail) => f.write_str(detail),
        }
    }
}

/// How the pipeline should treat a received status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// 204/205: success with nothing to parse.
    NoContent,
    Unauthorized,
    Forbidden,
    Failure,
}

pub struct ErrorClassifier;

impl ErrorClassifier {
    #[must_use]
    pub const fn classify_status(status: u16) -> StatusClass {
        match status {
            204 | 205 => StatusClass::NoContent,
            200..=299 => StatusClass::Success,
            401 => StatusClass::Unauthorized,
            403 => StatusClass::Forbidden,
            _ => StatusClass::Failure,
        }
    }

    /// Generic catch-all failure: `HTTP <code>: <detail>`.
    ///
    /// Requests that never got a status report code 0.
    pub fn network_error<T>(status: Option<u16>, detail: &str) -> ResponseEnvelope<T> {
        ResponseEnvelope::failure(ErrorCode::NetworkError)
            .with_message(format!("HTTP {}: {detail}", status.unwrap_or(0)))
    }

    pub fn transport_failure<T>(failure: &TransportFailure) -> ResponseEnvelope<T> {
        Self::network_error(None, &failure.to_string())
    }

    /// A non-2xx response outside the auth statuses.
    ///
    /// Servers that answer with a structured error keep their own code and
    /// message; anything else becomes `NETWORK_ERROR`.
    pub fn http_failure<T>(status: u16, reason: &str, body: &str) -> ResponseEnvelope<T> {
        ResponseNormalizer::failure_body(body)
            .unwrap_or_else(|| Self::network_error(Some(status), reason))
    }

    /// Forced pipeline code, keeping a server-supplied message if there is one.
    pub fn with_code<T>(code: ErrorCode, body: &str) -> ResponseEnvelope<T> {
        let message = ResponseNormalizer::failure_body::<()>(body).and_then(|env| env.message);
        let envelope = ResponseEnvelope::failure(code);
        match message {
            Some(message) if !message.is_empty() => envelope.with_message(message),
            _ => envelope,
        }
    }

    /// Short diagnostic text for a failed envelope.
    pub fn describe<T>(envelope: &ResponseEnvelope<T>) -> String {
        envelope
            .message
            .clone()
            .or_else(|| envelope.error.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}
