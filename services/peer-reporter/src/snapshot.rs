//! File-backed snapshot store, one per cadence
//!
//! A cycle holds the store's lock for its whole read-compute-write span so two
//! runs of the same cadence never interleave. Unreadable files load as an
//! empty baseline; writes go through a temp file and rename.

use crate::error::{ReporterError, ReporterResult};
use crate::types::{Cadence, PeerId, Snapshot};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Durable identifier to baseline mapping for one cadence
#[derive(Debug)]
pub struct SnapshotStore {
    cadence: Cadence,
    path: PathBuf,
    lock: Mutex<()>,
}

/// Exclusive access to a store for the duration of one cycle
#[derive(Debug)]
pub struct SnapshotGuard<'a> {
    store: &'a SnapshotStore,
    _held: MutexGuard<'a, ()>,
}

impl SnapshotStore {
    pub fn new(cadence: Cadence, path: impl Into<PathBuf>) -> Self {
        Self {
            cadence,
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for exclusive access
    pub async fn acquire(&self) -> SnapshotGuard<'_> {
        SnapshotGuard {
            store: self,
            _held: self.lock.lock().await,
        }
    }

    /// Exclusive access, or `None` while another cycle of this cadence is in flight
    pub fn try_acquire(&self) -> Option<SnapshotGuard<'_>> {
        self.lock.try_lock().ok().map(|held| SnapshotGuard {
            store: self,
            _held: held,
        })
    }

    async fn read(&self) -> Snapshot {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "No {} snapshot at {}, starting from empty baseline",
                    self.cadence,
                    self.path.display()
                );
                return Snapshot::new();
            }
            Err(e) => {
                warn!(
                    "{} snapshot at {} unreadable, treating as empty: {}",
                    self.cadence,
                    self.path.display(),
                    e
                );
                return Snapshot::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "{} snapshot at {} is corrupt, treating as empty: {}",
                    self.cadence,
                    self.path.display(),
                    e
                );
                Snapshot::new()
            }
        }
    }

    async fn write(&self, snapshot: &Snapshot) -> ReporterResult<()> {
        let persist_err = |reason: String| ReporterError::Snapshot {
            path: self.path.display().to_string(),
            reason,
        };

        let encoded = serde_json::to_vec_pretty(snapshot)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, &encoded))
            .await
            .map_err(|e| persist_err(e.to_string()))?
            .map_err(|e| persist_err(e.to_string()))?;

        info!(
            "Persisted {} snapshot with {} entries to {}",
            self.cadence,
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Write through a synced temp file in the target directory, then rename over `path`
fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl SnapshotGuard<'_> {
    /// Whole-store read; missing or corrupt state is an empty mapping
    pub async fn load(&self) -> Snapshot {
        self.store.read().await
    }

    /// Whole-store overwrite
    pub async fn commit(&self, snapshot: &Snapshot) -> ReporterResult<()> {
        self.store.write(snapshot).await
    }
}

/// Next baseline after a cycle
///
/// Fetched values replace their entries. Identifiers still tracked but not
/// fetched this cycle keep their previous entry. Identifiers nobody tracks
/// any more are dropped.
pub fn next_snapshot(previous: &Snapshot, fetched: &Snapshot, tracked: &[PeerId]) -> Snapshot {
    let tracked: HashSet<&PeerId> = tracked.iter().collect();
    let mut next: Snapshot = previous
        .iter()
        .filter(|(identifier, _)| tracked.contains(identifier))
        .map(|(identifier, entry)| (identifier.clone(), *entry))
        .collect();
    next.extend(fetched.iter().map(|(identifier, entry)| (identifier.clone(), *entry)));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SnapshotEntry;

    fn entry(rewards: i64, wins: i64) -> SnapshotEntry {
        SnapshotEntry { rewards, wins }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(Cadence::Short, dir.path().join("none.json"));
        assert!(store.acquire().await.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = SnapshotStore::new(Cadence::Daily, &path);
        assert!(store.acquire().await.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_commit_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(Cadence::Short, dir.path().join("nested/stats.json"));
        let mut snapshot = Snapshot::new();
        snapshot.insert(PeerId::from("QmABC"), entry(100, 5));

        let guard = store.acquire().await;
        guard.commit(&snapshot).await.unwrap();
        assert_eq!(guard.load().await, snapshot);
    }

    #[tokio::test]
    async fn test_commit_into_unusable_directory_is_snapshot_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = SnapshotStore::new(Cadence::Daily, blocker.join("stats.json"));

        let result = store.acquire().await.commit(&Snapshot::new()).await;
        assert!(matches!(result, Err(ReporterError::Snapshot { .. })));
    }

    #[tokio::test]
    async fn test_reads_plain_entry_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("previous_stats.json");
        std::fs::write(&path, r#"{"QmABC": {"rewards": 100, "wins": 5}}"#).unwrap();
        let store = SnapshotStore::new(Cadence::Short, &path);
        let loaded = store.acquire().await.load().await;
        assert_eq!(loaded.get(&PeerId::from("QmABC")), Some(&entry(100, 5)));
    }

    #[tokio::test]
    async fn test_second_acquire_is_refused_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(Cadence::Short, dir.path().join("s.json"));
        let held = store.try_acquire();
        assert!(held.is_some());
        assert!(store.try_acquire().is_none());
        drop(held);
        assert!(store.try_acquire().is_some());
    }

    #[test]
    fn test_next_snapshot_keeps_stale_tracked_and_drops_untracked() {
        let mut previous = Snapshot::new();
        previous.insert(PeerId::from("X"), entry(10, 1));
        previous.insert(PeerId::from("A"), entry(1, 1));
        previous.insert(PeerId::from("gone"), entry(9, 9));

        let mut fetched = Snapshot::new();
        fetched.insert(PeerId::from("A"), entry(2, 2));
        fetched.insert(PeerId::from("B"), entry(3, 3));

        let tracked = vec![PeerId::from("A"), PeerId::from("B"), PeerId::from("X")];
        let next = next_snapshot(&previous, &fetched, &tracked);

        assert_eq!(next.len(), 3);
        assert_eq!(next[&PeerId::from("X")], entry(10, 1));
        assert_eq!(next[&PeerId::from("A")], entry(2, 2));
        assert_eq!(next[&PeerId::from("B")], entry(3, 3));
        assert!(!next.contains_key(&PeerId::from("gone")));
    }
}
