//! Credential persistence adapters

pub mod device;
pub mod keychain;

pub use device::DeviceIdentity;
pub use keychain::KeychainCredentialStore;
