//! Peer reporter configuration

use crate::error::{ReporterError, ReporterResult};
use chrono::{FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "PEER_REPORTER";
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Metrics read endpoint
    pub metrics_endpoint: String,

    /// Identifiers starting with this prefix are queried by `id`, others by `name`
    pub id_prefix: String,

    /// Bounded wait per fetch in seconds
    pub fetch_timeout_secs: u64,

    /// Maximum simultaneous outbound fetches within one cycle
    pub max_concurrent_fetches: usize,

    /// Short cadence period in seconds
    pub short_interval_secs: u64,

    /// Delay before the first short cadence run
    pub short_initial_delay_secs: u64,

    /// Daily cadence wall-clock hour
    pub daily_hour: u32,

    /// Daily cadence wall-clock minute
    pub daily_minute: u32,

    /// Fixed zone of the daily time, minutes east of UTC (330 = +05:30)
    pub utc_offset_minutes: i32,

    /// Short cadence snapshot file
    pub short_snapshot_path: PathBuf,

    /// Daily cadence snapshot file
    pub daily_snapshot_path: PathBuf,

    /// Subscription registry file
    pub registry_path: PathBuf,

    /// Delivery channel settings
    pub telegram: TelegramConfig,

    /// Appended to daily and status reports
    pub footer: Option<String>,

    /// Directory for the rolling log file, stdout only when unset
    pub log_dir: Option<PathBuf>,
}

/// Telegram delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub token: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            token: None,
        }
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            metrics_endpoint: "https://dashboard.gensyn.ai/api/v1/peer".to_string(),
            id_prefix: "Qm".to_string(),
            fetch_timeout_secs: 10,
            max_concurrent_fetches: 8,
            short_interval_secs: 3600,
            short_initial_delay_secs: 10,
            daily_hour: 9,
            daily_minute: 0,
            utc_offset_minutes: 330,
            short_snapshot_path: PathBuf::from("previous_stats.json"),
            daily_snapshot_path: PathBuf::from("daily_summary_stats.json"),
            registry_path: PathBuf::from("watchlists.json"),
            telegram: TelegramConfig::default(),
            footer: None,
            log_dir: None,
        }
    }
}

impl ReporterConfig {
    /// Load from an optional file plus `PEER_REPORTER__*` environment overrides
    pub fn from_file(path: &str) -> ReporterResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler or fetcher cannot work with
    pub fn validate(&self) -> ReporterResult<()> {
        if self.metrics_endpoint.trim().is_empty() {
            return Err(invalid("metrics_endpoint must not be empty"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(invalid("fetch_timeout_secs must be at least 1"));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(invalid("max_concurrent_fetches must be at least 1"));
        }
        if self.short_interval_secs == 0 {
            return Err(invalid("short_interval_secs must be at least 1"));
        }
        if self.daily_hour > 23 || self.daily_minute > 59 {
            return Err(invalid(&format!(
                "daily time {:02}:{:02} is not a valid time of day",
                self.daily_hour, self.daily_minute
            )));
        }
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(invalid("utc_offset_minutes must be within +/-18 hours"));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn short_interval(&self) -> Duration {
        Duration::from_secs(self.short_interval_secs)
    }

    pub fn short_initial_delay(&self) -> Duration {
        Duration::from_secs(self.short_initial_delay_secs)
    }

    pub fn daily_time(&self) -> ReporterResult<NaiveTime> {
        NaiveTime::from_hms_opt(self.daily_hour, self.daily_minute, 0)
            .ok_or_else(|| invalid("daily time out of range"))
    }

    pub fn daily_zone(&self) -> ReporterResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or_else(|| invalid("utc_offset_minutes out of range"))
    }
}

fn invalid(message: &str) -> ReporterError {
    ReporterError::Config {
        message: message.to_string(),
    }
}
