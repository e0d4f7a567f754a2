//! One rotation cycle: create, list, filter, delete.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use super::filter::{is_expired, is_managed, select_expired, snapshot_name};
use crate::{
    api::{ApiError, ResourceType, Snapshot, SnapshotApi},
    config::{CreateFailurePolicy, RotationConfig},
};

/// Errors that stop a rotation run.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("Failed to create snapshot '{name}': {source}")]
    Create {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to list snapshots: {0}")]
    List(#[source] ApiError),
}

/// The snapshot requested during this run.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedSnapshot {
    pub name: String,
    pub action_id: u64,
    pub action_status: String,
}

/// A deletion that the API refused or that never reached it.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedDeletion {
    pub snapshot_id: String,
    pub snapshot_name: String,
    pub error: String,
}

/// Results from a single rotation run.
#[derive(Debug, Default)]
pub struct RotationRunResult {
    /// Snapshot triggered by this run, `None` in dry-run mode or on failure.
    pub created: Option<CreatedSnapshot>,
    /// Creation error when the policy allowed the run to continue.
    pub create_error: Option<String>,
    /// Number of snapshots that matched the deletion criteria.
    pub candidates: usize,
    /// Ids of deleted snapshots, in deletion order.
    pub deleted: Vec<String>,
    /// Deletions that failed.
    pub failed: Vec<FailedDeletion>,
    /// Candidates left alone because of `max_deletes_per_run`.
    pub skipped: usize,
    pub dry_run: bool,
}

impl RotationRunResult {
    /// Check if anything went wrong without aborting the run.
    pub fn has_failures(&self) -> bool {
        self.create_error.is_some() || !self.failed.is_empty()
    }
}

/// A snapshot of the target droplet together with its rotation status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SnapshotStatus {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub age_hours: i64,
    /// Name carries the configured prefix.
    pub managed: bool,
    /// Would be deleted by a run right now.
    pub expired: bool,
}

/// Drives rotation for one droplet.
pub struct Rotator {
    api: Arc<dyn SnapshotApi>,
    config: RotationConfig,
}

impl Rotator {
    pub fn new(api: Arc<dyn SnapshotApi>, config: RotationConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Run one rotation cycle against the current time.
    pub async fn run(&self) -> Result<RotationRunResult, RotationError> {
        self.run_at(Utc::now()).await
    }

    /// Run one rotation cycle as if the current time were `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RotationRunResult, RotationError> {
        let config = &self.config;
        let threshold = config.threshold();
        let dry_run_msg = if config.dry_run { " (DRY RUN)" } else { "" };

        tracing::info!(
            droplet_id = %config.droplet_id,
            prefix = %config.prefix,
            threshold_hours = config.threshold_hours,
            dry_run = config.dry_run,
            "Starting snapshot rotation{}",
            dry_run_msg
        );

        if config.prefix.is_empty() {
            tracing::warn!(
                droplet_id = %config.droplet_id,
                "No snapshot prefix configured, every snapshot of the droplet is eligible for deletion"
            );
        }

        let mut result = RotationRunResult {
            dry_run: config.dry_run,
            ..Default::default()
        };

        self.create_snapshot(now, &mut result).await?;

        let snapshots = self
            .api
            .list_snapshots(ResourceType::Droplet)
            .await
            .map_err(RotationError::List)?;

        let candidates = select_expired(
            &snapshots,
            &config.droplet_id,
            &config.prefix,
            threshold,
            now,
        );
        result.candidates = candidates.len();

        tracing::info!(
            listed = snapshots.len(),
            candidates = result.candidates,
            "Selected snapshots for deletion"
        );

        let limit = config.delete_limit().unwrap_or(usize::MAX);
        for (index, snapshot) in candidates.into_iter().enumerate() {
            if index >= limit {
                result.skipped += 1;
                continue;
            }
            self.delete_snapshot(snapshot, now, &mut result).await;
        }

        if result.skipped > 0 {
            tracing::info!(
                skipped = result.skipped,
                max_deletes_per_run = config.max_deletes_per_run,
                "Deletion cap reached, remaining snapshots left for a later run"
            );
        }

        if result.has_failures() {
            tracing::warn!(
                created = result.created.is_some(),
                candidates = result.candidates,
                deleted = result.deleted.len(),
                failed = result.failed.len(),
                skipped = result.skipped,
                dry_run = config.dry_run,
                "Snapshot rotation finished with errors{}",
                dry_run_msg
            );
        } else {
            tracing::info!(
                created = result.created.is_some(),
                candidates = result.candidates,
                deleted = result.deleted.len(),
                skipped = result.skipped,
                dry_run = config.dry_run,
                "Snapshot rotation complete{}",
                dry_run_msg
            );
        }

        Ok(result)
    }

    /// Trigger the snapshot for this run, applying the create-failure policy.
    async fn create_snapshot(
        &self,
        now: DateTime<Utc>,
        result: &mut RotationRunResult,
    ) -> Result<(), RotationError> {
        let config = &self.config;
        let name = snapshot_name(&config.prefix, &config.droplet_id, now);

        if config.dry_run {
            tracing::info!(
                droplet_id = %config.droplet_id,
                name = %name,
                "DRY RUN: Would create snapshot {}",
                name
            );
            return Ok(());
        }

        match self
            .api
            .create_droplet_snapshot(&config.droplet_id, &name)
            .await
        {
            Ok(action) => {
                tracing::info!(
                    droplet_id = %config.droplet_id,
                    name = %name,
                    action_id = action.id,
                    status = %action.status,
                    "Snapshot requested"
                );
                result.created = Some(CreatedSnapshot {
                    name,
                    action_id: action.id,
                    action_status: action.status,
                });
                Ok(())
            }
            Err(e) => match config.on_create_error {
                CreateFailurePolicy::Abort => Err(RotationError::Create { name, source: e }),
                CreateFailurePolicy::Continue => {
                    tracing::error!(
                        droplet_id = %config.droplet_id,
                        name = %name,
                        error = %e,
                        "Failed to create snapshot, pruning old snapshots anyway"
                    );
                    result.create_error = Some(e.to_string());
                    Ok(())
                }
            },
        }
    }

    /// Delete one candidate. Failures are recorded, never propagated.
    async fn delete_snapshot(
        &self,
        snapshot: &Snapshot,
        now: DateTime<Utc>,
        result: &mut RotationRunResult,
    ) {
        let age_hours = snapshot.age(now).num_hours();

        if self.config.dry_run {
            tracing::info!(
                snapshot_id = %snapshot.id,
                name = %snapshot.name,
                age_hours,
                "DRY RUN: Would delete snapshot {}",
                snapshot.name
            );
            return;
        }

        match self.api.delete_snapshot(&snapshot.id).await {
            Ok(()) => {
                tracing::info!(
                    snapshot_id = %snapshot.id,
                    name = %snapshot.name,
                    age_hours,
                    "Deleted snapshot"
                );
                result.deleted.push(snapshot.id.clone());
            }
            Err(e) => {
                tracing::warn!(
                    snapshot_id = %snapshot.id,
                    name = %snapshot.name,
                    error = %e,
                    "Failed to delete snapshot, continuing with the rest"
                );
                result.failed.push(FailedDeletion {
                    snapshot_id: snapshot.id.clone(),
                    snapshot_name: snapshot.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Snapshots of the configured droplet with their age and eligibility,
    /// oldest first. Nothing is created or deleted.
    pub async fn status_at(&self, now: DateTime<Utc>) -> Result<Vec<SnapshotStatus>, RotationError> {
        let config = &self.config;
        let threshold: TimeDelta = config.threshold();

        let snapshots = self
            .api
            .list_snapshots(ResourceType::Droplet)
            .await
            .map_err(RotationError::List)?;

        let mut statuses: Vec<SnapshotStatus> = snapshots
            .into_iter()
            .filter(|s| s.resource_id == config.droplet_id)
            .map(|snapshot| SnapshotStatus {
                age_hours: snapshot.age(now).num_hours(),
                managed: is_managed(&snapshot, &config.droplet_id, &config.prefix),
                expired: is_expired(
                    &snapshot,
                    &config.droplet_id,
                    &config.prefix,
                    threshold,
                    now,
                ),
                snapshot,
            })
            .collect();
        statuses.sort_by_key(|s| s.snapshot.created_at);

        Ok(statuses)
    }
}
