//! Peer Reporter - Main Entry Point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use peer_reporter::{
    build_status, status_text, Cadence, CycleStatus, DeltaEngine, FetchOutcome, HtmlRenderer,
    HttpMetricSource, JsonFileRegistry, LogNotifier, MetricSource, Notifier, PeerId,
    ReporterConfig, ScheduleTiming, Scheduler, SnapshotStore, SubscriberId, SubscriptionRegistry,
    TelegramNotifier,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "peer-reporter")]
#[command(version, about = "Differential peer metrics reports for subscribers")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "peer-reporter.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both cadences until interrupted
    Run,
    /// Run a single cycle now and exit
    Once {
        /// short or daily
        #[arg(long, default_value = "short")]
        cadence: Cadence,
    },
    /// Live status for one subscriber
    Status {
        #[arg(long)]
        subscriber: String,
        /// Deliver instead of printing
        #[arg(long)]
        send: bool,
    },
    /// Fetch a single peer by ID or name
    Probe { identifier: String },
}

fn init_logging(config: &ReporterConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "peer_reporter=info".into());

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "peer-reporter.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                ),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn build_notifier(config: &ReporterConfig) -> Result<Arc<dyn Notifier>> {
    match TelegramNotifier::from_config(&config.telegram)
        .context("Failed to create Telegram client")?
    {
        Some(telegram) => Ok(Arc::new(telegram)),
        None => {
            warn!("No Telegram token configured, reports will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ReporterConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    let _log_guard = init_logging(&config);

    let source: Arc<dyn MetricSource> = Arc::new(
        HttpMetricSource::from_config(&config).context("Failed to create metrics client")?,
    );
    let engine = Arc::new(DeltaEngine::new(
        Arc::clone(&source),
        config.max_concurrent_fetches,
    ));
    let registry: Arc<dyn SubscriptionRegistry> =
        Arc::new(JsonFileRegistry::new(&config.registry_path));
    let renderer = Arc::new(HtmlRenderer::new(config.footer.clone()));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let scheduler = Arc::new(Scheduler::new(
                registry,
                engine,
                build_notifier(&config)?,
                renderer,
                Arc::new(SnapshotStore::new(Cadence::Short, &config.short_snapshot_path)),
                Arc::new(SnapshotStore::new(Cadence::Daily, &config.daily_snapshot_path)),
            ));
            let timing = ScheduleTiming::from_config(&config)?;

            info!(
                "Starting peer reporter v{} against {}",
                env!("CARGO_PKG_VERSION"),
                config.metrics_endpoint
            );
            let (short, daily) = Arc::clone(&scheduler).spawn(timing);

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            info!("Shutdown requested, waiting for in-flight cycles");
            short.abort();
            daily.abort();
            let _idle = scheduler.quiesce().await;
            info!("All cycles committed, exiting");
        }
        Commands::Once { cadence } => {
            let scheduler = Scheduler::new(
                registry,
                engine,
                build_notifier(&config)?,
                renderer,
                Arc::new(SnapshotStore::new(Cadence::Short, &config.short_snapshot_path)),
                Arc::new(SnapshotStore::new(Cadence::Daily, &config.daily_snapshot_path)),
            );
            match scheduler.run_cycle(cadence).await? {
                CycleStatus::Completed(summary) => println!(
                    "{} cycle: {} tracked, {} fetched, {} not found, {} reports, {} failed deliveries, snapshot {}",
                    summary.cadence,
                    summary.tracked,
                    summary.fetched,
                    summary.not_found,
                    summary.reports_built,
                    summary.failed_deliveries(),
                    if summary.persisted { "saved" } else { "NOT saved" }
                ),
                CycleStatus::SkippedEmpty => println!("No peers tracked, nothing to do"),
                CycleStatus::SkippedBusy => println!("Cycle already running"),
            }
        }
        Commands::Status { subscriber, send } => {
            let subscriber = SubscriberId::new(subscriber);
            let watchlists = registry.watchlists().await?;
            let watchlist = watchlists.get(&subscriber).cloned().unwrap_or_default();

            let report = build_status(&watchlist, &engine).await;
            let text = status_text(report.as_ref(), renderer.as_ref());
            if send {
                build_notifier(&config)?.send(&subscriber, &text).await?;
                println!("Status sent to {subscriber}");
            } else {
                println!("{text}");
            }
        }
        Commands::Probe { identifier } => {
            let identifier = PeerId::new(identifier);
            match source.fetch(&identifier).await {
                FetchOutcome::Found(sample) => {
                    println!("{}", serde_json::to_string_pretty(&sample)?);
                }
                FetchOutcome::NotFound { cause } => {
                    println!(
                        "{identifier}: not found ({})",
                        cause.as_deref().unwrap_or("no detail")
                    );
                }
            }
        }
    }

    Ok(())
}
