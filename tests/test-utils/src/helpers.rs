//! Test helper functions and utilities

use anyhow::Result;
use peer_reporter::{
    Cadence, DeltaEngine, HtmlRenderer, MetricSource, Notifier, Scheduler, Snapshot,
    SnapshotStore, StaticRegistry, SubscriptionRegistry, Watchlists,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

/// Initialize test logging with environment-based configuration.
///
/// Safe to call multiple times - subsequent calls are ignored.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Wraps any future with a timeout to prevent tests from hanging indefinitely.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl std::future::Future<Output = T>,
) -> Result<T> {
    timeout(duration, future)
        .await
        .map_err(|_| anyhow::anyhow!("Test timeout after {:?}", duration))
}

/// Isolated snapshot directory with both cadence stores.
///
/// The directory is removed when the environment is dropped.
#[derive(Debug)]
pub struct TestEnvironment {
    temp_dir: tempfile::TempDir,
    pub short_store: Arc<SnapshotStore>,
    pub daily_store: Arc<SnapshotStore>,
}

impl TestEnvironment {
    /// Creates a fresh temporary directory with empty stores
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let short_store = Arc::new(SnapshotStore::new(
            Cadence::Short,
            temp_dir.path().join("previous_stats.json"),
        ));
        let daily_store = Arc::new(SnapshotStore::new(
            Cadence::Daily,
            temp_dir.path().join("daily_summary_stats.json"),
        ));
        Ok(Self {
            temp_dir,
            short_store,
            daily_store,
        })
    }

    /// Path to the temporary directory
    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Store for a cadence
    pub fn store(&self, cadence: Cadence) -> &Arc<SnapshotStore> {
        match cadence {
            Cadence::Short => &self.short_store,
            Cadence::Daily => &self.daily_store,
        }
    }

    /// Path of the file backing a cadence's store
    pub fn snapshot_path(&self, cadence: Cadence) -> PathBuf {
        self.store(cadence).path().to_path_buf()
    }

    /// Seeds a cadence's store with a baseline
    pub async fn seed(&self, cadence: Cadence, snapshot: &Snapshot) -> Result<()> {
        self.store(cadence).acquire().await.commit(snapshot).await?;
        Ok(())
    }

    /// Current persisted baseline of a cadence
    pub async fn persisted(&self, cadence: Cadence) -> Snapshot {
        self.store(cadence).acquire().await.load().await
    }

    /// Scheduler wired to this environment's stores and the given mocks
    pub fn scheduler(
        &self,
        watchlists: Watchlists,
        source: Arc<dyn MetricSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Scheduler {
        self.scheduler_with_registry(Arc::new(StaticRegistry::new(watchlists)), source, notifier)
    }

    /// Scheduler reading subscriptions from an arbitrary registry
    pub fn scheduler_with_registry(
        &self,
        registry: Arc<dyn SubscriptionRegistry>,
        source: Arc<dyn MetricSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Scheduler {
        Scheduler::new(
            registry,
            Arc::new(DeltaEngine::new(source, 4)),
            notifier,
            Arc::new(HtmlRenderer::default()),
            Arc::clone(&self.short_store),
            Arc::clone(&self.daily_store),
        )
    }
}
