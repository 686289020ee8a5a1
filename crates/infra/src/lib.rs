//! # GeoQuest Infrastructure
//!
//! Infrastructure implementations of core ports and the request pipeline.
//!
//! This crate contains:
//! - The request pipeline and single-flight token refresh
//! - Login, registration and logout
//! - HTTP transport (reqwest)
//! - OS keychain credential storage and device identity
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `geoquest-core`
//! - Depends on `geoquest-domain` and `geoquest-core`
//! - Contains all "impure" code (network, keychain, files)

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{AuthApi, RefreshCoordinator, RequestPipeline};
pub use auth::{DeviceIdentity, KeychainCredentialStore};
pub use errors::{InfraError, KeychainError, TransportError};
pub use http::{HttpClient, HttpClientBuilder, TransportResponse};
pub use observability::init_tracing;
