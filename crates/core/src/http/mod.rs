//! Request-side policy and response interpretation

pub mod classifier;
pub mod error_classifier;
pub mod normalizer;

pub use classifier::EndpointClassifier;
pub use error_classifier::{ErrorClassifier, StatusClass, TransportFailure};
pub use normalizer::ResponseNormalizer;
