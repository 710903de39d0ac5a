//! Delta engine
//!
//! Fetches every tracked identifier once per cycle, computes the change
//! against the cadence's baseline and picks the cycle's top performer.
//! The engine never writes snapshots.

use crate::fetcher::{FetchOutcome, MetricSource};
use crate::snapshot::SnapshotGuard;
use crate::types::{Cadence, DeltaRecord, MetricSample, PeerId, Snapshot, SnapshotEntry};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Winner of a cycle and the value it won with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopPerformer {
    pub identifier: PeerId,
    pub value: i64,
}

/// Everything one cycle learned from the metrics source
#[derive(Debug, Clone, Default)]
pub struct CycleDeltas {
    /// Records in first-seen order, zero changes included
    pub records: Vec<DeltaRecord>,
    pub top_performer: Option<TopPerformer>,
    /// Identifiers whose fetch came back not-found
    pub not_found: Vec<PeerId>,
    /// Baseline the deltas were computed against
    pub baseline: Snapshot,
    index: HashMap<PeerId, usize>,
}

impl CycleDeltas {
    pub fn new(
        records: Vec<DeltaRecord>,
        top_performer: Option<TopPerformer>,
        not_found: Vec<PeerId>,
        baseline: Snapshot,
    ) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.identifier.clone(), position))
            .collect();
        Self {
            records,
            top_performer,
            not_found,
            baseline,
            index,
        }
    }

    pub fn get(&self, identifier: &PeerId) -> Option<&DeltaRecord> {
        self.index.get(identifier).map(|&position| &self.records[position])
    }

    pub fn is_top(&self, identifier: &PeerId) -> bool {
        self.top_performer
            .as_ref()
            .is_some_and(|top| &top.identifier == identifier)
    }

    /// Current values of everything fetched this cycle
    pub fn fetched_snapshot(&self) -> Snapshot {
        self.records
            .iter()
            .map(|record| (record.identifier.clone(), SnapshotEntry::from(&record.sample)))
            .collect()
    }
}

/// Computes per-cycle deltas against a cadence baseline
pub struct DeltaEngine {
    source: Arc<dyn MetricSource>,
    max_concurrent_fetches: usize,
}

impl DeltaEngine {
    pub fn new(source: Arc<dyn MetricSource>, max_concurrent_fetches: usize) -> Self {
        Self {
            source,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    /// Load the baseline, fetch each unique identifier once and compute deltas
    pub async fn run(
        &self,
        cadence: Cadence,
        tracked: &[PeerId],
        store: &SnapshotGuard<'_>,
    ) -> CycleDeltas {
        let baseline = store.load().await;
        let fetched = self.fetch_all(tracked).await;
        let deltas = compute_deltas(cadence, baseline, fetched);

        info!(
            "{} cycle: {} tracked, {} fetched, {} not found, top performer {}",
            cadence,
            tracked.len(),
            deltas.records.len(),
            deltas.not_found.len(),
            deltas
                .top_performer
                .as_ref()
                .map_or("none", |top| top.identifier.as_str())
        );
        deltas
    }

    /// Fetch each unique identifier once, bounded fan-out, input order kept
    pub async fn fetch_all(&self, identifiers: &[PeerId]) -> Vec<(PeerId, FetchOutcome)> {
        let unique = crate::registry::dedup_first_seen(identifiers);
        let source = &self.source;

        stream::iter(unique)
            .map(|identifier| async move {
                let outcome = source.fetch(&identifier).await;
                match &outcome {
                    FetchOutcome::Found(_) => debug!("Fetched {}", identifier),
                    FetchOutcome::NotFound { cause } => warn!(
                        "{} not found this cycle ({})",
                        identifier,
                        cause.as_deref().unwrap_or("no detail")
                    ),
                }
                (identifier, outcome)
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await
    }
}

/// Pure delta computation over fetch outcomes in first-seen order
pub fn compute_deltas(
    cadence: Cadence,
    baseline: Snapshot,
    fetched: Vec<(PeerId, FetchOutcome)>,
) -> CycleDeltas {
    let mut records = Vec::with_capacity(fetched.len());
    let mut not_found = Vec::new();

    for (identifier, outcome) in fetched {
        match outcome {
            FetchOutcome::Found(sample) => {
                records.push(delta_for(identifier, sample, &baseline));
            }
            FetchOutcome::NotFound { .. } => not_found.push(identifier),
        }
    }

    let top_performer = select_top_performer(cadence, &records);
    CycleDeltas::new(records, top_performer, not_found, baseline)
}

fn delta_for(identifier: PeerId, sample: MetricSample, baseline: &Snapshot) -> DeltaRecord {
    let previous = baseline
        .get(&identifier)
        .copied()
        .unwrap_or_else(|| SnapshotEntry::from(&sample));

    DeltaRecord {
        reward_change: sample.reward.saturating_sub(previous.rewards),
        wins_change: sample.wins.saturating_sub(previous.wins),
        identifier,
        sample,
    }
}

/// Greatest qualifying value, strictly above zero, earliest record wins ties
///
/// The short cadence ranks raw wins, the daily cadence ranks wins change.
pub fn select_top_performer(cadence: Cadence, records: &[DeltaRecord]) -> Option<TopPerformer> {
    let mut best: Option<TopPerformer> = None;

    for record in records {
        let value = match cadence {
            Cadence::Short => record.sample.wins,
            Cadence::Daily => record.wins_change,
        };
        let threshold = best.as_ref().map_or(0, |top| top.value);
        if value > threshold {
            best = Some(TopPerformer {
                identifier: record.identifier.clone(),
                value,
            });
        }
    }

    best
}
