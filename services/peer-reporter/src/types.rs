//! Core data types shared by the engine, report assembler and scheduler

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tracked entity identifier, either a stable peer ID or a human-readable name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ID-form identifiers carry the configured prefix, everything else is a name
    pub fn is_id_form(&self, id_prefix: &str) -> bool {
        self.0.starts_with(id_prefix)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque subscriber handle (chat ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Every subscriber with its tracked identifiers, ordered by subscriber
pub type Watchlists = BTreeMap<SubscriberId, Vec<PeerId>>;

/// Fresh metrics for one peer as returned by the metrics endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSample {
    #[serde(rename = "reward", default, deserialize_with = "null_as_default")]
    pub reward: i64,
    #[serde(rename = "score", default, deserialize_with = "null_as_default")]
    pub wins: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub online: bool,
    #[serde(
        rename = "peerId",
        default = "not_available",
        deserialize_with = "null_as_not_available"
    )]
    pub display_id: String,
    #[serde(
        rename = "peerName",
        default = "not_available",
        deserialize_with = "null_as_not_available"
    )]
    pub display_name: String,
}

fn not_available() -> String {
    "N/A".to_string()
}

// Explicit nulls get the same fallback as absent fields
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_not_available<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(not_available))
}

/// Persisted baseline for one identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub rewards: i64,
    pub wins: i64,
}

impl From<&MetricSample> for SnapshotEntry {
    fn from(sample: &MetricSample) -> Self {
        Self {
            rewards: sample.reward,
            wins: sample.wins,
        }
    }
}

/// Identifier to baseline mapping for one cadence
pub type Snapshot = BTreeMap<PeerId, SnapshotEntry>;

/// The two independent scheduling tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// Recurring fixed period
    Short,
    /// Once per day at a fixed wall-clock time
    Daily,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Daily => "daily",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Cadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" | "hourly" => Ok(Self::Short),
            "daily" => Ok(Self::Daily),
            other => Err(format!("unknown cadence: {other}")),
        }
    }
}

/// Per-cycle change of one fetched peer against its baseline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRecord {
    pub identifier: PeerId,
    pub sample: MetricSample,
    pub reward_change: i64,
    pub wins_change: i64,
}
