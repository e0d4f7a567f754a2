//! Configuration module for the snapshot rotator.
//!
//! The rotator is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [api]
//! token = "${DIGITALOCEAN_TOKEN}"
//!
//! [rotation]
//! droplet_id = "123123123"
//! prefix = "auto-"
//! threshold_hours = 72
//! ```

mod api;
mod observability;
mod rotation;

use std::path::Path;

pub use api::*;
pub use observability::*;
pub use rotation::*;
use serde::Deserialize;

/// Root configuration.
///
/// `[api]` and `[rotation]` are required; `[logging]` falls back to defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotatorConfig {
    /// DigitalOcean API connection settings.
    pub api: ApiConfig,

    /// Which droplet to snapshot and which snapshots to prune.
    pub rotation: RotationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RotatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let config: RotatorConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.rotation.validate()?;

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Commented starter configuration written by `droplet-rotator init`.
pub fn default_config_toml() -> &'static str {
    r#"# Droplet snapshot rotator configuration

[api]
# Personal access token with write scope, read from the environment.
token = "${DIGITALOCEAN_TOKEN}"
# base_url = "https://api.digitalocean.com/v2/"
# connect_timeout_secs = 10
# timeout_secs = 60

[rotation]
# Droplet to snapshot. Replace with your droplet id.
droplet_id = "123123123"
# New snapshots are named "<prefix><droplet_id>-<YYYYMMDD-HHMMSS>".
# Only snapshots starting with this prefix are ever deleted.
prefix = "auto-"
# Delete matching snapshots older than this many hours.
threshold_hours = 72
# Log what would happen without creating or deleting anything.
dry_run = false
# "abort" skips pruning when the new snapshot could not be created,
# "continue" prunes anyway.
on_create_error = "abort"
# 0 means no limit.
max_deletes_per_run = 0

[logging]
level = "info"
format = "compact"
"#
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
///
/// Values are escaped for a TOML basic string, so `"${VAR}"` always yields the
/// variable's exact text.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid");
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        // Find if there's a comment on this line
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&escape_toml_basic(&value));

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

fn escape_toml_basic(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}
