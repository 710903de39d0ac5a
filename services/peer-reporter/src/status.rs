//! On-demand live status for one subscriber
//!
//! Fetches the subscriber's peers right now and reports absolute values.
//! Snapshots are never read or written here.

use crate::engine::{select_top_performer, DeltaEngine};
use crate::fetcher::FetchOutcome;
use crate::report::{Report, ReportEntry, ReportKind, ReportRenderer, Section, Summary};
use crate::types::{Cadence, DeltaRecord, PeerId};

pub const EMPTY_WATCHLIST_TEXT: &str = "Your tracking list is empty.";

/// Live status report, `None` for an empty watchlist
pub async fn build_status(watchlist: &[PeerId], engine: &DeltaEngine) -> Option<Report> {
    if watchlist.is_empty() {
        return None;
    }

    let fetched = engine.fetch_all(watchlist).await;
    let records: Vec<DeltaRecord> = fetched
        .iter()
        .filter_map(|(identifier, outcome)| match outcome {
            FetchOutcome::Found(sample) => Some(DeltaRecord {
                identifier: identifier.clone(),
                sample: sample.clone(),
                reward_change: 0,
                wins_change: 0,
            }),
            FetchOutcome::NotFound { .. } => None,
        })
        .collect();
    let top = select_top_performer(Cadence::Short, &records);

    let mut sections = Vec::with_capacity(fetched.len());
    let (mut rewards, mut wins) = (0_i64, 0_i64);
    for (identifier, outcome) in &fetched {
        match outcome {
            FetchOutcome::Found(sample) => {
                rewards = sample.reward.saturating_add(rewards);
                wins = sample.wins.saturating_add(wins);
                let is_top = top
                    .as_ref()
                    .is_some_and(|top| &top.identifier == identifier);
                sections.push(Section::Peer(ReportEntry::from_sample(
                    identifier, sample, None, is_top,
                )));
            }
            FetchOutcome::NotFound { .. } => sections.push(Section::Missing(identifier.clone())),
        }
    }

    Some(Report {
        kind: ReportKind::Status,
        sections,
        summary: Some(Summary::OverallTotals { rewards, wins }),
    })
}

/// Text for a status request, including the empty-watchlist reply
pub fn status_text(report: Option<&Report>, renderer: &dyn ReportRenderer) -> String {
    match report {
        Some(report) => renderer.render(report),
        None => EMPTY_WATCHLIST_TEXT.to_string(),
    }
}
