//! Contract types shared by the pipeline and its callers

pub mod auth;
pub mod envelope;
pub mod request;

pub use auth::{Credentials, TokenPayload};
pub use envelope::{ErrorCode, Recovery, ResponseEnvelope};
pub use request::{EndpointAuthPolicy, HttpMethod, Platform, RequestDescriptor};
