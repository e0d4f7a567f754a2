//! Snapshot rotation for a single droplet.
//!
//! A run performs, in order and one request at a time:
//! 1. Requests a new snapshot named `<prefix><droplet_id>-<YYYYMMDD-HHMMSS>`
//! 2. Lists all droplet snapshots
//! 3. Keeps those owned by the droplet, carrying the prefix, and strictly older
//!    than the threshold
//! 4. Deletes each of them, continuing past individual failures
//!
//! Snapshot creation is asynchronous on the DigitalOcean side, so the snapshot
//! requested in step 1 usually does not show up in step 2. Dry-run mode skips
//! steps 1 and 4 and only logs what would happen.

mod filter;
mod runner;

pub use filter::{is_expired, is_managed, select_expired, snapshot_name};
pub use runner::{
    CreatedSnapshot, FailedDeletion, RotationError, RotationRunResult, Rotator, SnapshotStatus,
};
