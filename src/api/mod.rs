//! DigitalOcean API client.
//!
//! Speaks authenticated JSON over HTTPS to the v2 API. Only the three calls the
//! rotator needs are implemented: trigger a droplet snapshot, list snapshots and
//! delete a snapshot.
//!
//! Every call returns an [`ApiResult`]; nothing is retried. Transport failures,
//! non-2xx responses and undecodable bodies are reported as distinct
//! [`ApiError`] variants so the caller can decide what is fatal.

mod client;
mod error;
mod types;

use async_trait::async_trait;
pub use client::{DEFAULT_BASE_URL, DigitalOceanClient};
pub use error::{ApiError, ApiResult};
pub use types::{Action, ResourceType, Snapshot};

/// Snapshot operations the rotator depends on.
#[async_trait]
pub trait SnapshotApi: Send + Sync {
    /// Trigger creation of a snapshot of `droplet_id` named `name`.
    ///
    /// Returns as soon as the action is accepted; the snapshot itself is
    /// produced asynchronously on the remote side.
    async fn create_droplet_snapshot(&self, droplet_id: &str, name: &str) -> ApiResult<Action>;

    /// List every snapshot of the given resource type.
    async fn list_snapshots(&self, resource_type: ResourceType) -> ApiResult<Vec<Snapshot>>;

    /// Delete a snapshot by id.
    async fn delete_snapshot(&self, snapshot_id: &str) -> ApiResult<()>;
}
