//! Wire types for the DigitalOcean v2 API.
//!
//! Only the fields the rotator reads are modelled. Unknown fields are ignored
//! so that additions on the API side never break decoding.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Resource type a snapshot was taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[default]
    Droplet,
    Volume,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Droplet => "droplet",
            ResourceType::Volume => "volume",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time snapshot stored by DigitalOcean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Id of the droplet (or volume) the snapshot was taken from.
    #[serde(deserialize_with = "string_or_number")]
    pub resource_id: String,

    pub name: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_disk_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_gigabytes: Option<f64>,
}

impl Snapshot {
    /// Time elapsed between creation and `now`. Negative when the snapshot
    /// claims to be from the future.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.created_at
    }
}

/// Body of `GET /snapshots`. A missing or `null` array means no snapshots.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SnapshotList {
    #[serde(default)]
    snapshots: Option<Vec<Snapshot>>,
}

impl SnapshotList {
    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots.unwrap_or_default()
    }
}

/// Body of `POST /droplets/{id}/actions` for a snapshot action.
#[derive(Debug, Serialize)]
pub(crate) struct SnapshotActionRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionResponse {
    pub action: Action,
}

/// A droplet action as reported by the API.
///
/// Actions run asynchronously on the DigitalOcean side; `status` is usually
/// `in-progress` when the create call returns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Action {
    pub id: u64,

    pub status: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

/// Snapshot ids are strings in the v2 API, but older payloads and some mocks
/// send bare integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}
