//! Metric fetcher for the external peer metrics endpoint
//!
//! Every failure mode (transport error, timeout, bad status, malformed or
//! empty payload) collapses into `FetchOutcome::NotFound`. The cause is kept
//! for logging only.

use crate::config::ReporterConfig;
use crate::error::ReporterResult;
use crate::types::{MetricSample, PeerId};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of a single fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(MetricSample),
    NotFound {
        /// Diagnostic detail, never branched on
        cause: Option<String>,
    },
}

impl FetchOutcome {
    pub fn not_found(cause: impl Into<String>) -> Self {
        Self::NotFound {
            cause: Some(cause.into()),
        }
    }

    pub fn into_sample(self) -> Option<MetricSample> {
        match self {
            Self::Found(sample) => Some(sample),
            Self::NotFound { .. } => None,
        }
    }
}

/// Read-only source of per-peer metrics
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch(&self, identifier: &PeerId) -> FetchOutcome;
}

/// HTTP metric source backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpMetricSource {
    client: Client,
    endpoint: String,
    id_prefix: String,
}

impl HttpMetricSource {
    pub fn new(
        endpoint: impl Into<String>,
        id_prefix: impl Into<String>,
        timeout: Duration,
    ) -> ReporterResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("peer-reporter/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            id_prefix: id_prefix.into(),
        })
    }

    pub fn from_config(config: &ReporterConfig) -> ReporterResult<Self> {
        Self::new(
            config.metrics_endpoint.clone(),
            config.id_prefix.clone(),
            config.fetch_timeout(),
        )
    }

    fn query_for<'a>(&self, identifier: &'a PeerId) -> (&'static str, &'a str) {
        if identifier.is_id_form(&self.id_prefix) {
            ("id", identifier.as_str())
        } else {
            ("name", identifier.as_str())
        }
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    async fn fetch(&self, identifier: &PeerId) -> FetchOutcome {
        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[self.query_for(identifier)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Metrics request for {} failed: {}", identifier, e);
                return FetchOutcome::not_found(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!("Metrics endpoint returned {} for {}", status, identifier);
            return FetchOutcome::not_found(format!("status {status}"));
        }

        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Metrics payload for {} could not be parsed: {}", identifier, e);
                return FetchOutcome::not_found(e.to_string());
            }
        };

        parse_payload(payload)
    }
}

/// Normalize a success payload: an object, or an array whose first element is used
pub fn parse_payload(payload: Value) -> FetchOutcome {
    let entity = match payload {
        Value::Array(items) => match items.into_iter().next() {
            Some(first) => first,
            None => return FetchOutcome::not_found("empty list"),
        },
        Value::Object(map) if map.is_empty() => return FetchOutcome::not_found("empty object"),
        object @ Value::Object(_) => object,
        other => return FetchOutcome::not_found(format!("unexpected payload: {other}")),
    };

    if !entity.is_object() || entity.as_object().is_some_and(|map| map.is_empty()) {
        return FetchOutcome::not_found("first element is not a populated object");
    }

    match serde_json::from_value::<MetricSample>(entity) {
        Ok(sample) => FetchOutcome::Found(sample),
        Err(e) => FetchOutcome::not_found(e.to_string()),
    }
}
