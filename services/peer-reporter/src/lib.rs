//! Peer Reporter Service
//!
//! Polls the peer metrics endpoint for every tracked peer and notifies
//! subscribers of what changed:
//! - Short-interval updates with every non-zero change
//! - Daily summaries with gains and change totals
//! - Top performer selection per cycle
//! - Per-cadence snapshot persistence
//! - Live status reports on demand

pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod notifier;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod snapshot;
pub mod status;
pub mod types;

pub use config::{ReporterConfig, TelegramConfig};
pub use engine::{compute_deltas, select_top_performer, CycleDeltas, DeltaEngine, TopPerformer};
pub use error::{ReporterError, ReporterResult};
pub use fetcher::{FetchOutcome, HttpMetricSource, MetricSource};
pub use notifier::{LogNotifier, Notifier, TelegramNotifier};
pub use registry::{tracked_union, JsonFileRegistry, StaticRegistry, SubscriptionRegistry};
pub use report::{build_report, HtmlRenderer, Report, ReportEntry, ReportKind, ReportRenderer};
pub use scheduler::{CycleStatus, CycleSummary, DeliveryOutcome, ScheduleTiming, Scheduler};
pub use snapshot::{next_snapshot, SnapshotGuard, SnapshotStore};
pub use status::{build_status, status_text};
pub use types::{
    Cadence, DeltaRecord, MetricSample, PeerId, Snapshot, SnapshotEntry, SubscriberId, Watchlists,
};
