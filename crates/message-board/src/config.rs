use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ClientError, ClientResult};

// Defaults for a locally running board API
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_INITIAL_INTERVAL_MS: u64 = 500;

pub const ENV_API_URL: &str = "MESSAGE_BOARD_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "MESSAGE_BOARD_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "MESSAGE_BOARD_MAX_RETRIES";

/// Configuration for the HTTP message service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the board API, including the version prefix
    pub api_base_url: String,
    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Maximum number of retries for transient failures
    pub max_retry_attempts: u32,
    /// First delay between retries in milliseconds, doubled per attempt
    pub retry_initial_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_initial_interval_ms: DEFAULT_RETRY_INITIAL_INTERVAL_MS,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `MESSAGE_BOARD_*` environment variables
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.api_base_url = url;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            config.request_timeout_seconds = timeout.trim().parse().map_err(|_| {
                ClientError::Config(format!(
                    "{} must be a number of seconds, got {:?}",
                    ENV_TIMEOUT_SECS, timeout
                ))
            })?;
        }
        if let Some(retries) = lookup(ENV_MAX_RETRIES) {
            config.max_retry_attempts = retries.trim().parse().map_err(|_| {
                ClientError::Config(format!(
                    "{} must be a whole number, got {:?}",
                    ENV_MAX_RETRIES, retries
                ))
            })?;
        }

        Ok(config)
    }

    /// Check that the base URL is absolute http(s) and the timeout is usable
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.api_base_url).map_err(|e| {
            ClientError::Config(format!("Invalid API URL {:?}: {}", self.api_base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "API URL must use http or https, got {}",
                url.scheme()
            )));
        }
        if self.request_timeout_seconds == 0 {
            return Err(ClientError::Config(
                "Request timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Absolute URL of `path` under the API base
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8080/api/v1");
        assert_eq!(config.request_timeout_seconds, 30);
        assert_eq!(config.max_retry_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_API_URL, "https://board.example.org/api/v1/"),
            (ENV_TIMEOUT_SECS, " 5 "),
            (ENV_MAX_RETRIES, "0"),
        ]))
        .unwrap();

        assert_eq!(config.request_timeout_seconds, 5);
        assert_eq!(config.max_retry_attempts, 0);
        assert_eq!(
            config.endpoint("/messages"),
            "https://board.example.org/api/v1/messages"
        );
    }

    #[test]
    fn test_bad_environment_values() {
        let err =
            ClientConfig::from_lookup(lookup_from(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_unusable_urls() {
        let relative = ClientConfig {
            api_base_url: "/api/v1".to_string(),
            ..ClientConfig::default()
        };
        assert!(relative.validate().is_err());

        let ftp = ClientConfig {
            api_base_url: "ftp://localhost/api".to_string(),
            ..ClientConfig::default()
        };
        assert!(ftp.validate().is_err());

        let no_timeout = ClientConfig {
            request_timeout_seconds: 0,
            ..ClientConfig::default()
        };
        assert!(no_timeout.validate().is_err());
    }
}
