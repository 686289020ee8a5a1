//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `GEOQUEST_BASE_URL` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `GEOQUEST_BASE_URL`: API root including `/api/v1` (required)
//! - `GEOQUEST_REQUEST_TIMEOUT`: Request timeout in seconds
//! - `GEOQUEST_REFRESH_TIMEOUT`: Refresh call timeout in seconds
//! - `GEOQUEST_EXPIRY_SKEW`: Access token expiry tolerance in seconds
//! - `GEOQUEST_PLATFORM`: `iOS`, `Android` or `Web`
//! - `GEOQUEST_DEVICE_ID`: Fixed device id
//! - `GEOQUEST_KEYCHAIN_SERVICE`: Keychain service name
//! - `GEOQUEST_USER_AGENT`: User agent sent with each request
//! - `GEOQUEST_LOG_LEVEL`: Default `EnvFilter` directive
//! - `GEOQUEST_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./geoquest.json` or `./geoquest.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use geoquest_domain::{ClientConfig, GeoQuestError, Platform, Result};

/// Load configuration with automatic fallback strategy
///
/// The result is validated before it is returned.
///
/// # Errors
/// Returns `GeoQuestError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value is out of range
pub fn load() -> Result<ClientConfig> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `GEOQUEST_BASE_URL` is required; every other setting keeps its
/// default when unset.
///
/// # Errors
/// Returns `GeoQuestError::Config` if the base URL is missing or a value
/// cannot be parsed.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::with_base_url(env_var("GEOQUEST_BASE_URL")?);

    if let Some(secs) = env_parsed::<u64>("GEOQUEST_REQUEST_TIMEOUT", "request timeout")? {
        config.request_timeout_secs = secs;
    }
    if let Some(secs) = env_parsed::<u64>("GEOQUEST_REFRESH_TIMEOUT", "refresh timeout")? {
        config.refresh_timeout_secs = secs;
    }
    if let Some(secs) = env_parsed::<i64>("GEOQUEST_EXPIRY_SKEW", "expiry skew")? {
        config.expiry_skew_secs = secs;
    }
    if let Some(platform) = optional_env("GEOQUEST_PLATFORM") {
        config.platform = Platform::from_str(&platform).map_err(GeoQuestError::Config)?;
    }
    if let Some(device_id) = optional_env("GEOQUEST_DEVICE_ID") {
        config.device_id = Some(device_id);
    }
    if let Some(service) = optional_env("GEOQUEST_KEYCHAIN_SERVICE") {
        config.keychain_service = service;
    }
    if let Some(agent) = optional_env("GEOQUEST_USER_AGENT") {
        config.user_agent = Some(agent);
    }
    if let Some(level) = optional_env("GEOQUEST_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("GEOQUEST_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Missing fields take their defaults.
///
/// # Errors
/// Returns `GeoQuestError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(GeoQuestError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            GeoQuestError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| GeoQuestError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| GeoQuestError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| GeoQuestError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(GeoQuestError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("geoquest.json"),
        dir.join("geoquest.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `GeoQuestError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| {
        GeoQuestError::Config(format!("Missing required environment variable: {key}"))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_parsed<T: FromStr>(key: &str, what: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| GeoQuestError::Config(format!("Invalid {what}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_KEYS: [&str; 10] = [
        "GEOQUEST_BASE_URL",
        "GEOQUEST_REQUEST_TIMEOUT",
        "GEOQUEST_REFRESH_TIMEOUT",
        "GEOQUEST_EXPIRY_SKEW",
        "GEOQUEST_PLATFORM",
        "GEOQUEST_DEVICE_ID",
        "GEOQUEST_KEYCHAIN_SERVICE",
        "GEOQUEST_USER_AGENT",
        "GEOQUEST_LOG_LEVEL",
        "GEOQUEST_LOG_JSON",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn temp_config(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for (key, value) in [("GQ_TEST_BOOL_1", "1"), ("GQ_TEST_BOOL_YES", "YES")] {
            std::env::set_var(key, value);
            assert!(env_bool(key, false));
            std::env::remove_var(key);
        }
        for (key, value) in [("GQ_TEST_BOOL_0", "0"), ("GQ_TEST_BOOL_OFF", "off")] {
            std::env::set_var(key, value);
            assert!(!env_bool(key, true));
            std::env::remove_var(key);
        }

        std::env::remove_var("GQ_TEST_BOOL_MISSING");
        assert!(env_bool("GQ_TEST_BOOL_MISSING", true));
        assert!(!env_bool("GQ_TEST_BOOL_MISSING", false));
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("GEOQUEST_BASE_URL", "https://staging.geoquest.app/api/v1");
        std::env::set_var("GEOQUEST_REQUEST_TIMEOUT", "20");
        std::env::set_var("GEOQUEST_REFRESH_TIMEOUT", "5");
        std::env::set_var("GEOQUEST_EXPIRY_SKEW", "30");
        std::env::set_var("GEOQUEST_PLATFORM", "android");
        std::env::set_var("GEOQUEST_DEVICE_ID", "device-abc");
        std::env::set_var("GEOQUEST_KEYCHAIN_SERVICE", "GeoQuest.staging");
        std::env::set_var("GEOQUEST_LOG_LEVEL", "debug");
        std::env::set_var("GEOQUEST_LOG_JSON", "true");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.base_url, "https://staging.geoquest.app/api/v1");
        assert_eq!(config.request_timeout_secs, 20);
        assert_eq!(config.refresh_timeout_secs, 5);
        assert_eq!(config.expiry_skew_secs, 30);
        assert_eq!(config.platform, Platform::Android);
        assert_eq!(config.device_id.as_deref(), Some("device-abc"));
        assert_eq!(config.keychain_service, "GeoQuest.staging");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_env_defaults_optional_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("GEOQUEST_BASE_URL", "http://localhost:3000/api/v1");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.refresh_timeout_secs, 10);
        assert_eq!(config.device_id, None);
    }

    #[test]
    fn test_load_from_env_missing_base_url() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, GeoQuestError::Config(msg) if msg.contains("GEOQUEST_BASE_URL")));
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("GEOQUEST_BASE_URL", "http://localhost:3000/api/v1");

        std::env::set_var("GEOQUEST_REQUEST_TIMEOUT", "soon");
        assert!(matches!(load_from_env(), Err(GeoQuestError::Config(_))));
        std::env::remove_var("GEOQUEST_REQUEST_TIMEOUT");

        std::env::set_var("GEOQUEST_PLATFORM", "Symbian");
        assert!(matches!(load_from_env(), Err(GeoQuestError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let path = temp_config(
            r#"{
                "base_url": "https://api.geoquest.app/api/v1",
                "request_timeout_secs": 12,
                "platform": "iOS",
                "logging": {"level": "warn", "json": true}
            }"#,
            "json",
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();

        let config = result.expect("config from JSON file");
        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.refresh_timeout_secs, 10);
        assert_eq!(config.platform, Platform::Ios);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = temp_config(
            r#"
base_url = "http://10.0.2.2:3000/api/v1"
refresh_timeout_secs = 4
platform = "Android"

[logging]
level = "debug"
"#,
            "toml",
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();

        let config = result.expect("config from TOML file");
        assert_eq!(config.base_url, "http://10.0.2.2:3000/api/v1");
        assert_eq!(config.refresh_timeout_secs, 4);
        assert_eq!(config.platform, Platform::Android);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(GeoQuestError::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = temp_config(r#"{ "base_url": "#, "json");
        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();
        assert!(result.is_err(), "Should fail with invalid JSON");
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("base_url: x", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_candidates_cover_both_names() {
        let names: Vec<_> = candidates_in(Path::new("/app"))
            .into_iter()
            .map(|p| p.display().to_string())
            .collect();
        assert!(names.contains(&"/app/config.toml".to_string()));
        assert!(names.contains(&"/app/geoquest.json".to_string()));
    }
}
