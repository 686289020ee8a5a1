//! Request-side contract types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::impl_wire_name_conversions;

/// HTTP verbs the pipeline is willing to send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl_wire_name_conversions!(HttpMethod {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Patch => "PATCH",
    Delete => "DELETE",
});

impl HttpMethod {
    /// Whether requests with this verb carry a JSON body even when the
    /// caller supplied none (an empty object is sent).
    #[must_use]
    pub const fn sends_body_by_default(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

/// One logical call as seen by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    /// Set once the call has been replayed after a token refresh.
    pub is_retry: bool,
}

impl RequestDescriptor {
    pub fn new(path: impl Into<String>, method: HttpMethod, body: Option<Value>) -> Self {
        Self { path: path.into(), method, body, is_retry: false }
    }

    /// The `METHOD path` key used in diagnostics and log de-duplication.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// JSON body to put on the wire, if any.
    #[must_use]
    pub fn wire_body(&self) -> Option<Value> {
        match (&self.body, self.method) {
            (_, HttpMethod::Get) => None,
            (Some(body), _) => Some(body.clone()),
            (None, method) if method.sends_body_by_default() => {
                Some(Value::Object(serde_json::Map::new()))
            }
            (None, _) => None,
        }
    }
}

/// Whether an endpoint needs an access token before it is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointAuthPolicy {
    Public,
    Protected,
}

impl EndpointAuthPolicy {
    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        matches!(self, Self::Protected)
    }
}

/// Client platform reported in `X-Platform`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "iOS", alias = "ios")]
    Ios,
    #[serde(rename = "Android", alias = "android")]
    Android,
    #[serde(rename = "Web", alias = "web")]
    Web,
}

impl_wire_name_conversions!(Platform {
    Ios => "iOS",
    Android => "Android",
    Web => "Web",
});

impl Platform {
    /// Platform of the running build.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "ios") {
            Self::Ios
        } else if cfg!(target_os = "android") {
            Self::Android
        } else {
            Self::Web
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}
