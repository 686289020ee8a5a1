//! Endpoint classification
//!
//! Decides before anything is sent whether a path needs an access token.
//! Public routes are a small fixed allowlist matched by prefix; everything
//! else is protected. Marking a protected route public is the dangerous
//! mistake, so auth routes only match on a whole path segment.

use std::collections::HashSet;

use geoquest_domain::constants::{
    API_BASE_PATH, GUEST_LOGIN_PATH, HEALTH_PATH, LOGIN_PATH, REFRESH_PATH, REGISTER_PATH,
};
use geoquest_domain::{EndpointAuthPolicy, HttpMethod};
use parking_lot::Mutex;
use tracing::warn;

#[derive(Debug, Clone)]
struct PublicRoute {
    prefix: String,
    /// Require the match to end at a `/` boundary (or the end of the path).
    whole_segment: bool,
}

impl PublicRoute {
    fn matches(&self, path: &str) -> bool {
        let (Some(head), Some(rest)) =
            (path.get(..self.prefix.len()), path.get(self.prefix.len()..))
        else {
            return false;
        };
        head.eq_ignore_ascii_case(&self.prefix)
            && (!self.whole_segment || rest.is_empty() || rest.starts_with('/'))
    }
}

#[derive(Debug)]
pub struct EndpointClassifier {
    public_routes: Vec<PublicRoute>,
    reported_skips: Mutex<HashSet<String>>,
}

impl EndpointClassifier {
    #[must_use]
    pub fn new() -> Self {
        let segment =
            |prefix: &str| PublicRoute { prefix: prefix.to_string(), whole_segment: true };
        Self {
            public_routes: vec![
                PublicRoute { prefix: HEALTH_PATH.to_string(), whole_segment: false },
                segment(LOGIN_PATH),
                segment(REGISTER_PATH),
                segment(GUEST_LOGIN_PATH),
                segment(REFRESH_PATH),
            ],
            reported_skips: Mutex::new(HashSet::new()),
        }
    }

    /// Reduce whatever the caller passed to a route path.
    ///
    /// Full URLs lose scheme and host; query strings and fragments are
    /// dropped; the `/api/v1` base prefix is removed; the result always
    /// starts with `/`.
    #[must_use]
    pub fn normalize_path(raw: &str) -> String {
        let trimmed = raw.trim();

        let without_origin = match trimmed.find("://") {
            Some(scheme_end) => {
                let after_scheme = &trimmed[scheme_end + 3..];
                after_scheme.find('/').map_or("", |slash| &after_scheme[slash..])
            }
            None => trimmed,
        };

        let path = without_origin.split(['?', '#']).next().unwrap_or_default();

        let mut absolute =
            if path.starts_with('/') { path.to_string() } else { format!("/{path}") };

        let base = API_BASE_PATH;
        let has_base =
            absolute.get(..base.len()).is_some_and(|head| head.eq_ignore_ascii_case(base));
        if has_base {
            let rest = absolute.get(base.len()..).unwrap_or_default();
            if rest.is_empty() {
                absolute = "/".to_string();
            } else if rest.starts_with('/') {
                absolute = rest.to_string();
            }
        }

        absolute
    }

    #[must_use]
    pub fn policy(&self, path: &str) -> EndpointAuthPolicy {
        let normalized = Self::normalize_path(path);
        if self.public_routes.iter().any(|route| route.matches(&normalized)) {
            EndpointAuthPolicy::Public
        } else {
            EndpointAuthPolicy::Protected
        }
    }

    #[must_use]
    pub fn requires_authentication(&self, path: &str) -> bool {
        self.policy(path).requires_authentication()
    }

    /// Record that a protected call was skipped for lack of a session.
    ///
    /// Warns once per `METHOD path`; returns whether this was the first time.
    pub fn note_skipped(&self, method: HttpMethod, path: &str) -> bool {
        let key = format!("{method} {}", Self::normalize_path(path));
        let first = self.reported_skips.lock().insert(key.clone());
        if first {
            warn!(request = %key, "skipping protected request: not authenticated");
        }
        first
    }
}

impl Default for EndpointClassifier {
    fn default() -> Self {
        Self::new()
    }
}
