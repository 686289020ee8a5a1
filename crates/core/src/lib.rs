//! # GeoQuest Core
//!
//! Pure logic of the authenticated request pipeline - no HTTP or keychain
//! code.
//!
//! This crate contains:
//! - Token state and JWT expiry inspection (`auth`)
//! - Endpoint classification, response normalization and error
//!   classification (`http`)
//! - The session event bus (`session`)
//!
//! ## Architecture Principles
//! - Only depends on `geoquest-domain`
//! - Persistence reached through the [`CredentialStore`] port
//! - Interpretation of transport outcomes lives here so it is testable
//!   without a server

pub mod auth;
pub mod http;
pub mod session;

pub use auth::{jwt, CredentialStore, MemoryCredentialStore, TokenStore};
pub use http::{
    EndpointClassifier, ErrorClassifier, ResponseNormalizer, StatusClass, TransportFailure,
};
pub use session::{SessionEvent, SessionEvents};
