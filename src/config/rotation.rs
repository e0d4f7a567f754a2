//! Snapshot rotation configuration.
//!
//! # Example
//!
//! ```toml
//! [rotation]
//! droplet_id = "123123123"
//! prefix = "auto-"
//! threshold_hours = 72
//! dry_run = false
//! on_create_error = "abort"
//! max_deletes_per_run = 0
//! ```

use chrono::TimeDelta;
use serde::Deserialize;

use super::ConfigError;

/// Upper bound on the threshold (100 years), keeps the duration math in range.
const MAX_THRESHOLD_HOURS: u64 = 24 * 365 * 100;

/// What to do when the snapshot for this run cannot be created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateFailurePolicy {
    /// Stop before deleting anything.
    #[default]
    Abort,
    /// Log the failure and prune old snapshots anyway.
    Continue,
}

/// Rotation settings for a single droplet.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotationConfig {
    /// Numeric id of the droplet to snapshot. Only snapshots of this droplet
    /// are ever deleted.
    pub droplet_id: String,

    /// Name prefix for new snapshots. Only snapshots whose name starts with it
    /// are eligible for deletion. An empty prefix makes every snapshot of the
    /// droplet eligible.
    /// Default: "auto-"
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Snapshots strictly older than this are deleted (in hours).
    /// Default: 72
    #[serde(default = "default_threshold_hours")]
    pub threshold_hours: u64,

    /// If true, log what would be created and deleted without doing it.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// Behaviour when creating the new snapshot fails.
    /// Default: abort
    #[serde(default)]
    pub on_create_error: CreateFailurePolicy,

    /// Maximum number of snapshots to delete per run.
    /// Set to 0 for unlimited.
    /// Default: 0
    #[serde(default)]
    pub max_deletes_per_run: usize,
}

fn default_prefix() -> String {
    "auto-".to_string()
}

fn default_threshold_hours() -> u64 {
    72
}

impl RotationConfig {
    /// Minimal config for a droplet, all other settings at their defaults.
    pub fn new(droplet_id: impl Into<String>) -> Self {
        Self {
            droplet_id: droplet_id.into(),
            prefix: default_prefix(),
            threshold_hours: default_threshold_hours(),
            dry_run: false,
            on_create_error: CreateFailurePolicy::default(),
            max_deletes_per_run: 0,
        }
    }

    /// Get the age threshold as a duration.
    pub fn threshold(&self) -> TimeDelta {
        TimeDelta::hours(self.threshold_hours.min(MAX_THRESHOLD_HOURS) as i64)
    }

    /// Deletion cap for one run, `None` when unlimited.
    pub fn delete_limit(&self) -> Option<usize> {
        (self.max_deletes_per_run > 0).then_some(self.max_deletes_per_run)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.droplet_id.is_empty() || !self.droplet_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Validation(format!(
                "rotation.droplet_id must be a numeric droplet id, got '{}'",
                self.droplet_id
            )));
        }

        if self.threshold_hours == 0 {
            return Err(ConfigError::Validation(
                "rotation.threshold_hours must be greater than zero".into(),
            ));
        }

        if self.threshold_hours > MAX_THRESHOLD_HOURS {
            return Err(ConfigError::Validation(format!(
                "rotation.threshold_hours must be at most {MAX_THRESHOLD_HOURS}"
            )));
        }

        Ok(())
    }
}
