//! The response envelope and its closed error taxonomy

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::impl_wire_name_conversions;

/// Error codes the pipeline itself can produce
///
/// Servers may return other strings in `error`; those are passed through
/// untouched and map to `None` in [`ResponseEnvelope::error_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AuthRequired,
    TokenExpired,
    Unauthorized,
    AccessDenied,
    InvalidMethod,
    ParseError,
    EmptyResponse,
    NetworkError,
    InvalidSettingsResponse,
    InvalidRewardsResponse,
}

impl_wire_name_conversions!(ErrorCode {
    AuthRequired => "AUTH_REQUIRED",
    TokenExpired => "TOKEN_EXPIRED",
    Unauthorized => "UNAUTHORIZED",
    AccessDenied => "ACCESS_DENIED",
    InvalidMethod => "INVALID_METHOD",
    ParseError => "PARSE_ERROR",
    EmptyResponse => "EMPTY_RESPONSE",
    NetworkError => "NETWORK_ERROR",
    InvalidSettingsResponse => "INVALID_SETTINGS_RESPONSE",
    InvalidRewardsResponse => "INVALID_REWARDS_RESPONSE",
});

/// What the UI layer should do with a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Route to the login flow.
    Reauthenticate,
    /// Show a restriction message and drop the session.
    ForceLogout,
    /// Show a generic error the user may retry.
    Retryable,
    /// Show the error as-is; retrying will not help.
    Surface,
}

impl ErrorCode {
    #[must_use]
    pub const fn recovery(&self) -> Recovery {
        match self {
            Self::AuthRequired | Self::TokenExpired | Self::Unauthorized => {
                Recovery::Reauthenticate
            }
            Self::AccessDenied => Recovery::ForceLogout,
            Self::NetworkError | Self::ParseError => Recovery::Retryable,
            Self::InvalidMethod
            | Self::EmptyResponse
            | Self::InvalidSettingsResponse
            | Self::InvalidRewardsResponse => Recovery::Surface,
        }
    }

    /// Domain-normalizer codes behave like `PARSE_ERROR` downstream.
    #[must_use]
    pub const fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::ParseError | Self::InvalidSettingsResponse | Self::InvalidRewardsResponse
        )
    }
}

/// Fixed outer shape wrapping every API payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl<T> ResponseEnvelope<T> {
    pub const fn ok(data: Option<T>) -> Self {
        Self { success: true, data, error: None, message: None, timestamp: None }
    }

    pub fn failure(code: ErrorCode) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(code.as_str().to_string()),
            message: None,
            timestamp: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The pipeline-level code in `error`, if it is one of ours.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_deref().and_then(|raw| raw.parse().ok())
    }

    /// Re-type a failure, dropping any partial payload.
    pub fn into_failure<U>(self) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            success: false,
            data: None,
            error: self.error,
            message: self.message,
            timestamp: self.timestamp,
        }
    }
}

impl ResponseEnvelope<Value> {
    /// Bind the loosely-typed `data` to `T`.
    ///
    /// A successful envelope whose payload does not fit `T` becomes a failure
    /// carrying `shape_error`. Failures keep their own error and drop `data`.
    pub fn narrow<T: DeserializeOwned>(self, shape_error: ErrorCode) -> ResponseEnvelope<T> {
        if !self.success {
            return self.into_failure();
        }

        let payload = self.data.unwrap_or(Value::Null);
        let had_payload = !payload.is_null();
        match serde_json::from_value::<T>(payload) {
            Ok(data) => ResponseEnvelope {
                success: true,
                data: Some(data),
                error: None,
                message: self.message,
                timestamp: self.timestamp,
            },
            Err(_) if !had_payload => ResponseEnvelope {
                success: true,
                data: None,
                error: None,
                message: self.message,
                timestamp: self.timestamp,
            },
            Err(err) => ResponseEnvelope::failure(shape_error).with_message(err.to_string()),
        }
    }
}
