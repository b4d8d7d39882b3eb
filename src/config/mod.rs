//! Configuration module for the portal client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote document store
    pub api_url: String,
    /// Path to the JSON file backing durable client storage
    pub storage_path: PathBuf,
    /// Hours a session stays valid after login
    pub session_ttl_hours: i64,
    /// Timeout applied to every remote request
    pub request_timeout: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_url = env::var("PORTAL_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let storage_path = env::var("PORTAL_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/storage.json".to_string())
            .into();

        let session_ttl_hours = env::var("PORTAL_SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);

        let request_timeout = env::var("PORTAL_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        let log_level = env::var("PORTAL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            api_url,
            storage_path,
            session_ttl_hours,
            request_timeout,
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("PORTAL_API_URL");
        env::remove_var("PORTAL_STORAGE_PATH");
        env::remove_var("PORTAL_SESSION_TTL_HOURS");
        env::remove_var("PORTAL_REQUEST_TIMEOUT_SECS");
        env::remove_var("PORTAL_LOG_LEVEL");

        let config = Config::from_env();

        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.storage_path, PathBuf::from("./data/storage.json"));
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.log_level, "info");
    }
}
