//! Client constants
//!
//! Centralized location for wire-level constants shared by every crate.

// Timeouts (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_EXPIRY_SKEW_SECS: i64 = 15;

// Routes, relative to the API base (`.../api/v1`)
pub const DEFAULT_BASE_URL: &str = "https://api.geoquest.app/api/v1";
pub const API_BASE_PATH: &str = "/api/v1";
pub const HEALTH_PATH: &str = "/health";
pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const GUEST_LOGIN_PATH: &str = "/auth/guest";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

// Request headers
pub const HEADER_DEVICE_ID: &str = "X-Device-Id";
pub const HEADER_PLATFORM: &str = "X-Platform";
pub const CONTENT_TYPE_JSON: &str = "application/json";

// Persisted credential keys
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "GeoQuest.auth";
pub const STORAGE_KEY_ACCESS_TOKEN: &str = "geoquest.access_token";
pub const STORAGE_KEY_REFRESH_TOKEN: &str = "geoquest.refresh_token";
pub const STORAGE_KEY_USER_ID: &str = "geoquest.user_id";
pub const STORAGE_KEY_DEVICE_ID: &str = "geoquest.device_id";

// Session events
pub const SESSION_EVENT_CAPACITY: usize = 64;
