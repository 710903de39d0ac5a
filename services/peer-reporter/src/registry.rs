//! Read-only view of the subscription registry

use crate::error::{ReporterError, ReporterResult};
use crate::types::{PeerId, Watchlists};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// Source of every subscriber's tracked identifiers
#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    async fn watchlists(&self) -> ReporterResult<Watchlists>;
}

/// Registry kept in a JSON file: `{ "<subscriber>": ["<identifier>", ...] }`
///
/// The file is owned by the front-end and re-read on every call.
#[derive(Debug, Clone)]
pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SubscriptionRegistry for JsonFileRegistry {
    async fn watchlists(&self) -> ReporterResult<Watchlists> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No registry at {}, no subscribers", self.path.display());
                return Ok(Watchlists::new());
            }
            Err(e) => {
                return Err(ReporterError::Registry(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&raw)
            .map_err(|e| ReporterError::Registry(format!("{}: {}", self.path.display(), e)))
    }
}

/// Fixed in-memory registry
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    watchlists: Watchlists,
}

impl StaticRegistry {
    pub fn new(watchlists: Watchlists) -> Self {
        Self { watchlists }
    }
}

#[async_trait]
impl SubscriptionRegistry for StaticRegistry {
    async fn watchlists(&self) -> ReporterResult<Watchlists> {
        Ok(self.watchlists.clone())
    }
}

/// Union of every tracked identifier, deduplicated in first-seen order
///
/// Subscribers are visited in registry order and identifiers in list order,
/// which makes the result (and the top performer tie-break) deterministic.
pub fn tracked_union(watchlists: &Watchlists) -> Vec<PeerId> {
    dedup_first_seen(watchlists.values().flatten())
}

pub(crate) fn dedup_first_seen<'a>(identifiers: impl IntoIterator<Item = &'a PeerId>) -> Vec<PeerId> {
    let mut seen = HashSet::new();
    identifiers
        .into_iter()
        .filter(|identifier| seen.insert(*identifier))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubscriberId;

    #[test]
    fn test_union_is_deduplicated_in_first_seen_order() {
        let mut watchlists = Watchlists::new();
        watchlists.insert(
            SubscriberId::from("100"),
            vec![PeerId::from("A"), PeerId::from("B")],
        );
        watchlists.insert(
            SubscriberId::from("200"),
            vec![PeerId::from("B"), PeerId::from("C"), PeerId::from("A")],
        );

        assert_eq!(
            tracked_union(&watchlists),
            vec![PeerId::from("A"), PeerId::from("B"), PeerId::from("C")]
        );
    }

    #[tokio::test]
    async fn test_file_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlists.json");
        std::fs::write(&path, r#"{"42": ["QmABC", "swift fox"], "7": []}"#).unwrap();

        let watchlists = JsonFileRegistry::new(&path).watchlists().await.unwrap();
        assert_eq!(watchlists.len(), 2);
        assert_eq!(
            watchlists[&SubscriberId::from("42")],
            vec![PeerId::from("QmABC"), PeerId::from("swift fox")]
        );
        assert!(watchlists[&SubscriberId::from("7")].is_empty());
    }

    #[tokio::test]
    async fn test_missing_registry_file_has_no_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JsonFileRegistry::new(dir.path().join("absent.json"));
        assert!(registry.watchlists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_registry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlists.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let result = JsonFileRegistry::new(&path).watchlists().await;
        assert!(matches!(result, Err(ReporterError::Registry(_))));
    }
}
