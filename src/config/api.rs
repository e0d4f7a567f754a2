use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;
use crate::api::DEFAULT_BASE_URL;

/// DigitalOcean API connection settings.
///
/// Requests are never retried. A failed call is reported once and the rotator
/// decides whether it is fatal.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// API base URL.
    /// Default: "https://api.digitalocean.com/v2/"
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Personal access token with read/write scope.
    /// Usually supplied through `${DIGITALOCEAN_TOKEN}`.
    pub token: String,

    /// Maximum time to establish a connection (in seconds).
    /// Default: 10
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum time for a whole request, including the body (in seconds).
    /// Default: 60
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    60
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Validation("api.token must not be empty".into()));
        }

        let url = url::Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Validation(format!("api.base_url '{}' is invalid: {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.connect_timeout_secs == 0 || self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "api timeouts must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
