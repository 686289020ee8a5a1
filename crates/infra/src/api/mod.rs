//! Authenticated API access
//!
//! Every network call from the game layers goes through [`RequestPipeline`].
//!
//! # Architecture
//!
//! - [`RequestPipeline`]: classify → build → send → interpret →
//!   (refresh → retry once) → normalize
//! - [`RefreshCoordinator`]: single-flight token refresh, the only writer of
//!   tokens apart from [`AuthApi`]
//! - [`AuthApi`]: login, register, guest login and logout entry points

pub mod auth;
pub mod pipeline;
pub mod refresh;

use geoquest_domain::constants::API_BASE_PATH;

pub use auth::AuthApi;
pub use pipeline::RequestPipeline;
pub use refresh::RefreshCoordinator;

/// Join a route onto the API root.
///
/// Absolute URLs pass through untouched. A route that repeats the
/// `/api/v1` prefix already present in `base_url` is not doubled.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let base = base_url.trim().trim_end_matches('/');
    let mut route = if path.starts_with('/') { path.to_string() } else { format!("/{path}") };

    if base.ends_with(API_BASE_PATH) {
        let repeated = route
            .get(..API_BASE_PATH.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(API_BASE_PATH));
        let rest = route.get(API_BASE_PATH.len()..).unwrap_or_default();
        if repeated && (rest.is_empty() || rest.starts_with(['/', '?'])) {
            route = rest.to_string();
        }
    }

    format!("{base}{route}")
}
