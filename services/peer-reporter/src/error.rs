//! Error types for the peer reporter

use thiserror::Error;

/// Peer reporter error types
#[derive(Debug, Error)]
pub enum ReporterError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Snapshot could not be written
    #[error("Snapshot persistence failed for {path}: {reason}")]
    Snapshot {
        /// File backing the store
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Subscription registry could not be read
    #[error("Subscription registry unavailable: {0}")]
    Registry(String),

    /// A report could not be delivered to one subscriber
    #[error("Delivery to {subscriber} failed: {reason}")]
    DeliveryFailed {
        /// Subscriber the report was addressed to
        subscriber: String,
        /// Transport or API failure
        reason: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ReporterError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

/// Type alias for reporter results
pub type ReporterResult<T> = Result<T, ReporterError>;
