//! Configuration module for the form builder backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Request timeout in seconds; a hung store call becomes an error
    /// instead of an indefinitely pending request
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("FORMS_DB_PATH")
            .unwrap_or_else(|_| "./data/forms.sqlite".to_string())
            .into();

        let bind_addr = env::var("FORMS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid FORMS_BIND_ADDR format");

        let log_level = env::var("FORMS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let request_timeout_secs = env::var("FORMS_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8);

        Self {
            db_path,
            bind_addr,
            log_level,
            request_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("FORMS_DB_PATH");
        env::remove_var("FORMS_BIND_ADDR");
        env::remove_var("FORMS_LOG_LEVEL");
        env::remove_var("FORMS_REQUEST_TIMEOUT_SECS");

        let config = Config::from_env();

        assert_eq!(config.db_path, PathBuf::from("./data/forms.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.request_timeout_secs, 8);
    }
}
