//! # GeoQuest Domain
//!
//! Wire and contract types for the GeoQuest client networking core.
//!
//! This crate contains:
//! - The response envelope and its closed error taxonomy
//! - Credential and token payload types
//! - Request descriptors, HTTP verbs and platforms
//! - Client configuration and domain errors
//!
//! ## Architecture
//! - No dependencies on other GeoQuest crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
