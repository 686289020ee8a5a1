//! Credential types
//!
//! `Credentials` is the in-memory token triple. `TokenPayload` is the
//! lenient view of what login/register/guest/refresh responses carry in
//! `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Access/refresh token pair plus the owning user id
///
/// Both tokens are empty together or populated together after a
/// successful set. `Debug` never prints token material.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
}

impl Credentials {
    /// Build credentials, coercing missing values to empty strings.
    #[must_use]
    pub fn new(access: Option<&str>, refresh: Option<&str>, user_id: Option<&str>) -> Self {
        Self {
            access_token: access.unwrap_or_default().to_string(),
            refresh_token: refresh.unwrap_or_default().to_string(),
            user_id: user_id.unwrap_or_default().to_string(),
        }
    }

    #[must_use]
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// True when nothing at all is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.refresh_token.is_empty() && self.user_id.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token_len", &self.access_token.len())
            .field("refresh_token_len", &self.refresh_token.len())
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Token material returned by the auth routes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    #[serde(default, alias = "access_token", alias = "token")]
    pub access_token: Option<String>,
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub user: Option<Value>,
}

impl TokenPayload {
    /// Parse the `data` member of an auth response.
    pub fn from_data(data: &Value) -> Option<Self> {
        serde_json::from_value(data.clone()).ok()
    }

    /// User id from `userId`, or from a nested `user.id` / `user._id`.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        let nested = self.user.as_ref().and_then(|user| user.get("id").or_else(|| user.get("_id")));
        self.user_id.as_ref().or(nested).and_then(scalar_to_string).filter(|id| !id.is_empty())
    }

    /// Credentials when both tokens are present and non-empty.
    ///
    /// `fallback_user_id` is used when the payload omits the user (refresh
    /// responses commonly do).
    #[must_use]
    pub fn into_credentials(self, fallback_user_id: &str) -> Option<Credentials> {
        let user_id = self.user_id().unwrap_or_else(|| fallback_user_id.to_string());
        let access = self.access_token.filter(|t| !t.is_empty())?;
        let refresh = self.refresh_token.filter(|t| !t.is_empty())?;
        Some(Credentials { access_token: access, refresh_token: refresh, user_id })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
