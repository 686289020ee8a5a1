//! Credential state: JWT inspection, persistence port, token store

pub mod jwt;
pub mod memory;
pub mod ports;
pub mod token_store;

pub use memory::MemoryCredentialStore;
pub use ports::CredentialStore;
pub use token_store::TokenStore;
