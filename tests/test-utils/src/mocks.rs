//! Mock collaborators for driving the reporter in tests

use async_trait::async_trait;
use peer_reporter::{
    FetchOutcome, MetricSample, MetricSource, Notifier, PeerId, ReporterError, ReporterResult,
    SubscriberId, SubscriptionRegistry, Watchlists,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Mock metric source serving canned samples
///
/// Identifiers without a sample come back as not-found. Every call is
/// counted so tests can assert on fetch de-duplication.
#[derive(Debug, Default)]
pub struct MockMetricSource {
    samples: Mutex<HashMap<PeerId, MetricSample>>,
    calls: Mutex<Vec<PeerId>>,
}

impl MockMetricSource {
    /// Creates an empty source where every fetch is not-found
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source pre-loaded with `(identifier, sample)` pairs
    pub fn with_samples<'a>(samples: impl IntoIterator<Item = (&'a str, MetricSample)>) -> Self {
        let source = Self::new();
        for (identifier, sample) in samples {
            source.set(identifier, sample);
        }
        source
    }

    /// Sets or replaces the sample returned for an identifier
    pub fn set(&self, identifier: &str, sample: MetricSample) {
        self.samples
            .lock()
            .unwrap()
            .insert(PeerId::from(identifier), sample);
    }

    /// Makes subsequent fetches of an identifier come back not-found
    pub fn remove(&self, identifier: &str) {
        self.samples.lock().unwrap().remove(&PeerId::from(identifier));
    }

    /// Number of fetches made for an identifier
    pub fn calls_for(&self, identifier: &str) -> usize {
        let identifier = PeerId::from(identifier);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| **called == identifier)
            .count()
    }

    /// Total fetches made
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Forgets recorded calls
    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl MetricSource for MockMetricSource {
    async fn fetch(&self, identifier: &PeerId) -> FetchOutcome {
        self.calls.lock().unwrap().push(identifier.clone());
        match self.samples.lock().unwrap().get(identifier) {
            Some(sample) => FetchOutcome::Found(sample.clone()),
            None => FetchOutcome::not_found("no canned sample"),
        }
    }
}

/// Notifier that records deliveries and fails for chosen subscribers
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(SubscriberId, String)>>,
    failing: Mutex<HashSet<SubscriberId>>,
    delay: Mutex<Duration>,
}

impl RecordingNotifier {
    /// Creates a notifier where every delivery succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery to `subscriber` fail
    pub fn fail_for(&self, subscriber: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(SubscriberId::from(subscriber));
    }

    /// Makes every delivery take `delay` before completing
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Successful deliveries in send order
    pub fn sent(&self) -> Vec<(SubscriberId, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts delivered to one subscriber
    pub fn sent_to(&self, subscriber: &str) -> Vec<String> {
        let subscriber = SubscriberId::from(subscriber);
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == subscriber)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Forgets recorded deliveries
    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subscriber: &SubscriberId, text: &str) -> ReporterResult<()> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(subscriber) {
            return Err(ReporterError::DeliveryFailed {
                subscriber: subscriber.to_string(),
                reason: "chat not found".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((subscriber.clone(), text.to_string()));
        Ok(())
    }
}

/// Registry whose every read fails, like an unreadable registry file
#[derive(Debug, Clone)]
pub struct FailingRegistry {
    reason: String,
}

impl FailingRegistry {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SubscriptionRegistry for FailingRegistry {
    async fn watchlists(&self) -> ReporterResult<Watchlists> {
        Err(ReporterError::Registry(self.reason.clone()))
    }
}
