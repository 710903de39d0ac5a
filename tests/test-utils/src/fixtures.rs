//! Test fixtures for common test data

use peer_reporter::{MetricSample, PeerId, Snapshot, SnapshotEntry, SubscriberId, Watchlists};
use rstest::*;

/// Builds a sample with the given reward and wins, online, named after its ID
pub fn sample(display_id: &str, reward: i64, wins: i64) -> MetricSample {
    MetricSample {
        reward,
        wins,
        online: true,
        display_id: display_id.to_string(),
        display_name: format!("{display_id} node"),
    }
}

/// Builds a snapshot from `(identifier, rewards, wins)` triples
pub fn snapshot_of(entries: &[(&str, i64, i64)]) -> Snapshot {
    entries
        .iter()
        .map(|(identifier, rewards, wins)| {
            (
                PeerId::from(*identifier),
                SnapshotEntry {
                    rewards: *rewards,
                    wins: *wins,
                },
            )
        })
        .collect()
}

/// Builds watchlists from `(subscriber, "id1, id2, ...")` pairs
pub fn watchlists_of(entries: &[(&str, &str)]) -> Watchlists {
    entries
        .iter()
        .map(|(subscriber, identifiers)| {
            (
                SubscriberId::from(*subscriber),
                identifiers
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(PeerId::from)
                    .collect(),
            )
        })
        .collect()
}

/// Standard sample for a long ID-form peer
#[fixture]
pub fn id_peer_sample() -> MetricSample {
    sample("QmYyQSo1c1Ym7orWxLYvCrM2EmxFTANf8wXmmE7DWjhx5N", 120, 5)
}

/// Two subscribers with overlapping watchlists `{A, B}` and `{B, C}`
#[fixture]
pub fn overlapping_watchlists() -> Watchlists {
    watchlists_of(&[("1001", "A, B"), ("1002", "B, C")])
}
