//! Error types used throughout the client core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for GeoQuest
///
/// Used for everything that is *not* a request outcome: configuration,
/// credential storage, transport construction. Request outcomes are always
/// delivered as a [`crate::ResponseEnvelope`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum GeoQuestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for GeoQuest operations
pub type Result<T> = std::result::Result<T, GeoQuestError>;
