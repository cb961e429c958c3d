//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Applies to every outbound generation call.
    pub generation_timeout: Duration,
    pub session_ttl: chrono::Duration,
    pub cookie_secure: bool,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        // --- Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", &var("BIND_ADDRESS", "0.0.0.0:5000"))?;
        let database_url = var("DATABASE_URL", "sqlite://documents.db");

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Generation Settings ---
        let gemini_api_key = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty());
        let gemini_model = var("GEMINI_MODEL", "gemini-2.0-flash-exp");
        let gemini_base_url = var(
            "GEMINI_BASE_URL",
            "https://generativelanguage.googleapis.com/v1beta",
        );
        let timeout_secs: u64 =
            parse_var("GENERATION_TIMEOUT_SECS", &var("GENERATION_TIMEOUT_SECS", "30"))?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "GENERATION_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        // --- Session Settings ---
        let ttl_days: i64 = parse_var("SESSION_TTL_DAYS", &var("SESSION_TTL_DAYS", "30"))?;
        if ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let cookie_secure = parse_bool("COOKIE_SECURE", &var("COOKIE_SECURE", "false"))?;
        let cors_origin = var("CORS_ORIGIN", "http://localhost:5000");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            generation_timeout: Duration::from_secs(timeout_secs),
            session_ttl: chrono::Duration::days(ttl_days),
            cookie_secure,
            cors_origin,
        })
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a boolean", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 5000);
        assert_eq!(config.database_url, "sqlite://documents.db");
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.gemini_model, "gemini-2.0-flash-exp");
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
        assert_eq!(config.session_ttl, chrono::Duration::days(30));
        assert!(!config.cookie_secure);
        assert_eq!(config.cors_origin, "http://localhost:5000");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("GEMINI_API_KEY", "secret"),
            ("GENERATION_TIMEOUT_SECS", "5"),
            ("COOKIE_SECURE", "true"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.gemini_api_key.as_deref(), Some("secret"));
        assert_eq!(config.generation_timeout, Duration::from_secs(5));
        assert!(config.cookie_secure);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = config_from(&[("GEMINI_API_KEY", "  ")]).unwrap();
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("BIND_ADDRESS", "nowhere")]),
            Err(ConfigError::InvalidValue(key, _)) if key == "BIND_ADDRESS"
        ));
        assert!(matches!(
            config_from(&[("GENERATION_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidValue(key, _)) if key == "GENERATION_TIMEOUT_SECS"
        ));
        assert!(matches!(
            config_from(&[("COOKIE_SECURE", "maybe")]),
            Err(ConfigError::InvalidValue(key, _)) if key == "COOKIE_SECURE"
        ));
        assert!(config_from(&[("RUST_LOG", "loud")]).is_err());
    }
}
