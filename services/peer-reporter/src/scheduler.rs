//! Cadence scheduler
//!
//! Drives the delta engine and report assembly on two independent timers.
//! Each cadence owns its snapshot store; a firing that finds its own cadence
//! still running is skipped. Delivery failures are isolated per subscriber.

use crate::config::ReporterConfig;
use crate::engine::DeltaEngine;
use crate::error::{ReporterError, ReporterResult};
use crate::notifier::Notifier;
use crate::registry::{tracked_union, SubscriptionRegistry};
use crate::report::{build_report, Report, ReportRenderer};
use crate::snapshot::{next_snapshot, SnapshotGuard, SnapshotStore};
use crate::types::{Cadence, SubscriberId};
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// When the two cadences fire
#[derive(Debug, Clone, Copy)]
pub struct ScheduleTiming {
    pub short_interval: Duration,
    pub short_initial_delay: Duration,
    pub daily_time: NaiveTime,
    pub daily_zone: FixedOffset,
}

impl ScheduleTiming {
    pub fn from_config(config: &ReporterConfig) -> ReporterResult<Self> {
        Ok(Self {
            short_interval: config.short_interval(),
            short_initial_delay: config.short_initial_delay(),
            daily_time: config.daily_time()?,
            daily_zone: config.daily_zone()?,
        })
    }
}

/// Outcome of delivering one subscriber's report
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub subscriber: SubscriberId,
    pub result: ReporterResult<()>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// What a completed cycle did
#[derive(Debug)]
pub struct CycleSummary {
    pub cadence: Cadence,
    pub tracked: usize,
    pub fetched: usize,
    pub not_found: usize,
    pub reports_built: usize,
    pub deliveries: Vec<DeliveryOutcome>,
    pub persisted: bool,
}

impl CycleSummary {
    pub fn failed_deliveries(&self) -> usize {
        self.deliveries.iter().filter(|d| !d.is_success()).count()
    }
}

/// How a firing ended
#[derive(Debug)]
pub enum CycleStatus {
    Completed(CycleSummary),
    /// Nobody tracks anything; no fetches, no snapshot write
    SkippedEmpty,
    /// The previous run of this cadence still holds its store
    SkippedBusy,
}

/// Runs report cycles for both cadences
pub struct Scheduler {
    registry: Arc<dyn SubscriptionRegistry>,
    engine: Arc<DeltaEngine>,
    notifier: Arc<dyn Notifier>,
    renderer: Arc<dyn ReportRenderer>,
    short_store: Arc<SnapshotStore>,
    daily_store: Arc<SnapshotStore>,
}

impl Scheduler {
    pub fn new(
        registry: Arc<dyn SubscriptionRegistry>,
        engine: Arc<DeltaEngine>,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn ReportRenderer>,
        short_store: Arc<SnapshotStore>,
        daily_store: Arc<SnapshotStore>,
    ) -> Self {
        Self {
            registry,
            engine,
            notifier,
            renderer,
            short_store,
            daily_store,
        }
    }

    fn store(&self, cadence: Cadence) -> &SnapshotStore {
        match cadence {
            Cadence::Short => &self.short_store,
            Cadence::Daily => &self.daily_store,
        }
    }

    /// Run one cycle of a cadence to completion
    pub async fn run_cycle(&self, cadence: Cadence) -> ReporterResult<CycleStatus> {
        let Some(guard) = self.store(cadence).try_acquire() else {
            warn!("Previous {} cycle still running, skipping this firing", cadence);
            return Ok(CycleStatus::SkippedBusy);
        };

        info!("Starting {} update cycle", cadence);
        let watchlists = self.registry.watchlists().await?;
        let tracked = tracked_union(&watchlists);
        if tracked.is_empty() {
            info!("{} update: no peers in any watchlist, skipping", cadence);
            return Ok(CycleStatus::SkippedEmpty);
        }

        let deltas = self.engine.run(cadence, &tracked, &guard).await;

        let reports: Vec<(SubscriberId, Report)> = watchlists
            .iter()
            .filter_map(|(subscriber, watchlist)| {
                build_report(watchlist, &deltas, cadence).map(|report| (subscriber.clone(), report))
            })
            .collect();
        let deliveries = self.deliver_all(cadence, &reports).await;

        let next = next_snapshot(&deltas.baseline, &deltas.fetched_snapshot(), &tracked);
        let persisted = match guard.commit(&next).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to persist {} snapshot: {}", cadence, e);
                false
            }
        };

        let summary = CycleSummary {
            cadence,
            tracked: tracked.len(),
            fetched: deltas.records.len(),
            not_found: deltas.not_found.len(),
            reports_built: reports.len(),
            deliveries,
            persisted,
        };
        info!(
            "{} update cycle finished: {} reports, {} delivery failures",
            cadence,
            summary.reports_built,
            summary.failed_deliveries()
        );
        Ok(CycleStatus::Completed(summary))
    }

    /// Deliver every report independently, collecting each outcome
    async fn deliver_all(
        &self,
        cadence: Cadence,
        reports: &[(SubscriberId, Report)],
    ) -> Vec<DeliveryOutcome> {
        let sends = reports.iter().map(|(subscriber, report)| async move {
            let text = self.renderer.render(report);
            let result = self.notifier.send(subscriber, &text).await;
            if let Err(e) = &result {
                error!("Failed to send {} report to {}: {}", cadence, subscriber, e);
            }
            DeliveryOutcome {
                subscriber: subscriber.clone(),
                result,
            }
        });

        join_all(sends).await
    }

    async fn run_and_log(&self, cadence: Cadence) {
        match self.run_cycle(cadence).await {
            Ok(_) => {}
            Err(ReporterError::Registry(reason)) => {
                error!("{} cycle aborted, registry unreadable: {}", cadence, reason);
            }
            Err(e) => error!("{} cycle failed: {}", cadence, e),
        }
    }

    /// Wait for in-flight cycles of both cadences to commit
    ///
    /// New firings are skipped for as long as the returned guards are held.
    pub async fn quiesce(&self) -> (SnapshotGuard<'_>, SnapshotGuard<'_>) {
        let short = self.short_store.acquire().await;
        let daily = self.daily_store.acquire().await;
        (short, daily)
    }

    /// Start both cadence timers
    pub fn spawn(self: Arc<Self>, timing: ScheduleTiming) -> (JoinHandle<()>, JoinHandle<()>) {
        let short = tokio::spawn(Arc::clone(&self).short_loop(timing));
        let daily = tokio::spawn(self.daily_loop(timing));
        (short, daily)
    }

    async fn short_loop(self: Arc<Self>, timing: ScheduleTiming) {
        let mut ticker = interval_at(
            Instant::now() + timing.short_initial_delay,
            timing.short_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "Short cadence every {:?}, first run in {:?}",
            timing.short_interval, timing.short_initial_delay
        );

        loop {
            ticker.tick().await;
            let this = Arc::clone(&self);
            tokio::spawn(async move { this.run_and_log(Cadence::Short).await });
        }
    }

    async fn daily_loop(self: Arc<Self>, timing: ScheduleTiming) {
        let mut next = next_daily_run(Utc::now(), timing.daily_time, timing.daily_zone);

        loop {
            info!(
                "Next daily summary at {}",
                next.with_timezone(&timing.daily_zone)
            );
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            sleep(wait).await;

            let this = Arc::clone(&self);
            tokio::spawn(async move { this.run_and_log(Cadence::Daily).await });

            next = next_daily_run(next.max(Utc::now()), timing.daily_time, timing.daily_zone);
        }
    }
}

/// First occurrence of `time` in `zone` strictly after `after`
pub fn next_daily_run(after: DateTime<Utc>, time: NaiveTime, zone: FixedOffset) -> DateTime<Utc> {
    let offset = chrono::Duration::seconds(i64::from(zone.local_minus_utc()));
    let local_date = after.with_timezone(&zone).date_naive();

    let at_local = |date: chrono::NaiveDate| (date.and_time(time) - offset).and_utc();

    let today = at_local(local_date);
    if today > after {
        today
    } else {
        at_local(local_date + chrono::Duration::days(1))
    }
}
