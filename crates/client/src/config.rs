//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `ROSTER_API_BASE_URL` - Backend base URL (default: `http://localhost:8080/`)
//! - `ROSTER_CACHE_CAPACITY` - Maximum cached queries (default: 1000)
//! - `ROSTER_CACHE_IDLE_SECS` - Seconds an unread query stays cached (default: 60)

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
const DEFAULT_CACHE_CAPACITY: u64 = 1000;
const DEFAULT_CACHE_IDLE_SECS: u64 = 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid base URL {0}: {1}")]
    InvalidBaseUrl(String, String),
}

/// Query client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL; always ends with `/` so relative paths join under it.
    pub base_url: Url,
    /// Maximum number of cached queries.
    pub cache_capacity: u64,
    /// How long a cached query survives without being read.
    pub cache_idle: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_env_or_default("ROSTER_API_BASE_URL", DEFAULT_BASE_URL);
        let cache_capacity = parse_env("ROSTER_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?;
        let cache_idle_secs = parse_env("ROSTER_CACHE_IDLE_SECS", DEFAULT_CACHE_IDLE_SECS)?;

        Ok(Self {
            base_url: parse_base_url(&base_url)?,
            cache_capacity,
            cache_idle: Duration::from_secs(cache_idle_secs),
        })
    }

    /// Configuration for a given base URL with default cache settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if the URL cannot be parsed or
    /// is not `http`/`https`.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_idle: Duration::from_secs(DEFAULT_CACHE_IDLE_SECS),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Parse a base URL, adding the trailing slash `Url::join` needs.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };

    let url = Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidBaseUrl(raw.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl(
            raw.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::new("http://localhost:8080/api").unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/api/");
        assert_eq!(
            config.base_url.join("users/5").unwrap().as_str(),
            "http://localhost:8080/api/users/5"
        );
    }

    #[test]
    fn test_default_base_url_is_valid() {
        let config = ClientConfig::new(DEFAULT_BASE_URL).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.cache_idle, Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(
            ClientConfig::new("ftp://example.com"),
            Err(ConfigError::InvalidBaseUrl(..))
        ));
        assert!(ClientConfig::new("not a url").is_err());
    }
}
