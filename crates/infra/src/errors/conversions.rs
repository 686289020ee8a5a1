//! Conversions from external infrastructure errors into domain errors.

use std::time::Duration;

use geoquest_core::TransportFailure;
use geoquest_domain::GeoQuestError;
use keyring::Error as KeyringError;
use reqwest::Error as HttpError;

use super::{KeychainError, TransportError};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub GeoQuestError);

impl From<InfraError> for GeoQuestError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<GeoQuestError> for InfraError {
    fn from(value: GeoQuestError) -> Self {
        Self(value)
    }
}

trait IntoGeoQuestError {
    fn into_geoquest(self) -> GeoQuestError;
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → GeoQuestError */
/* -------------------------------------------------------------------------- */

impl IntoGeoQuestError for KeyringError {
    fn into_geoquest(self) -> GeoQuestError {
        match self {
            Self::NoEntry => GeoQuestError::Storage("keychain entry not found".into()),
            Self::BadEncoding(_) => {
                GeoQuestError::Storage("credential in keychain is not valid UTF-8".into())
            }
            Self::TooLong(name, limit) => GeoQuestError::Storage(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            Self::Invalid(attr, reason) => {
                GeoQuestError::Storage(format!("keychain attribute '{attr}' is invalid: {reason}"))
            }
            Self::PlatformFailure(err) => {
                GeoQuestError::Storage(format!("keychain platform error: {err}"))
            }
            Self::NoStorageAccess(err) => {
                GeoQuestError::Storage(format!("unable to access secure storage: {err}"))
            }
            other => GeoQuestError::Storage(other.to_string()),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        Self(value.into_geoquest())
    }
}

impl From<KeychainError> for GeoQuestError {
    fn from(value: KeychainError) -> Self {
        match value {
            KeychainError::Keyring(err) => err.into_geoquest(),
            other => Self::Storage(other.to_string()),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError / GeoQuestError */
/* -------------------------------------------------------------------------- */

impl TransportError {
    /// Classify a `reqwest` failure; `timeout` is the limit that applied.
    #[must_use]
    pub fn from_reqwest(err: &HttpError, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout(timeout);
        }
        if err.is_connect() {
            return Self::Connect(err.to_string());
        }
        if err.is_builder() {
            return Self::Build(err.to_string());
        }
        if err.is_body() || err.is_decode() {
            return Self::Body(err.to_string());
        }
        Self::Other(err.to_string())
    }
}

impl From<TransportError> for TransportFailure {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Timeout(after) => Self::Timeout(after),
            TransportError::Connect(detail) => Self::Connect(detail),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<TransportError> for GeoQuestError {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Build(detail) => Self::InvalidInput(detail),
            other => Self::Network(other.to_string()),
        }
    }
}

impl IntoGeoQuestError for HttpError {
    fn into_geoquest(self) -> GeoQuestError {
        if self.is_builder() {
            return GeoQuestError::Config(format!("failed to build HTTP client: {self}"));
        }
        GeoQuestError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_geoquest())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
