//! Infrastructure-local error types
//!
//! Adapters report failures with these enums; `conversions` maps them (and
//! the raw `reqwest`/`keyring` errors) onto the domain error.

pub mod conversions;

use std::time::Duration;

use thiserror::Error;

pub use conversions::InfraError;

/// Failure of the HTTP transport before a status code was received
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to build request: {0}")]
    Build(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Keychain error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found in keychain
    #[error("Entry not found")]
    NotFound,

    /// Underlying keyring library error
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}
