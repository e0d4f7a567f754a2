//! Pure helpers: snapshot naming and deletion eligibility.

use chrono::{DateTime, TimeDelta, Utc};

use crate::api::Snapshot;

/// Timestamp suffix for new snapshot names, second granularity.
const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Name for a snapshot taken at `now`: `"{prefix}{droplet_id}-{YYYYMMDD-HHMMSS}"`.
pub fn snapshot_name(prefix: &str, droplet_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "{prefix}{droplet_id}-{}",
        now.format(NAME_TIMESTAMP_FORMAT)
    )
}

/// Whether the snapshot belongs to `droplet_id` and carries `prefix`.
///
/// An empty prefix matches every name.
pub fn is_managed(snapshot: &Snapshot, droplet_id: &str, prefix: &str) -> bool {
    snapshot.resource_id == droplet_id && snapshot.name.starts_with(prefix)
}

/// Whether the snapshot is managed and strictly older than `threshold`.
pub fn is_expired(
    snapshot: &Snapshot,
    droplet_id: &str,
    prefix: &str,
    threshold: TimeDelta,
    now: DateTime<Utc>,
) -> bool {
    is_managed(snapshot, droplet_id, prefix) && snapshot.age(now) > threshold
}

/// Snapshots eligible for deletion, in list order.
pub fn select_expired<'a>(
    snapshots: &'a [Snapshot],
    droplet_id: &str,
    prefix: &str,
    threshold: TimeDelta,
    now: DateTime<Utc>,
) -> Vec<&'a Snapshot> {
    snapshots
        .iter()
        .filter(|s| is_expired(s, droplet_id, prefix, threshold, now))
        .collect()
}
