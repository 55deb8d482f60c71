//! Snapshot persistence keyed by (provider, repository, branch, commit).

pub mod memory;
pub mod sqlite;

use std::sync::Arc;
use tracing::debug;

use crate::domain::{FileRecord, Snapshot, SnapshotKey};
use crate::error::CacheError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Backing storage for snapshots.
///
/// Implementations must make an insert visible atomically: a concurrent reader
/// sees either no record or the complete one.
pub trait SnapshotStore: Send + Sync {
    fn find_first(&self, key: &SnapshotKey) -> Result<Option<Snapshot>, CacheError>;

    /// Insert or replace the snapshot stored under its key.
    fn insert(&self, snapshot: &Snapshot) -> Result<(), CacheError>;
}

/// Exact-match snapshot lookup and storage.
#[derive(Clone)]
pub struct SnapshotCache {
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn get(&self, key: &SnapshotKey) -> Result<Option<Snapshot>, CacheError> {
        let found = self.store.find_first(key)?;
        debug!("Cache {} for {}", if found.is_some() { "hit" } else { "miss" }, key);
        Ok(found)
    }

    /// Build a snapshot from `files` and store it, replacing any previous one.
    pub fn put(&self, key: SnapshotKey, files: Vec<FileRecord>) -> Result<Snapshot, CacheError> {
        let snapshot = Snapshot::new(key, files);
        self.store(&snapshot)?;
        Ok(snapshot)
    }

    pub fn store(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        self.store.insert(snapshot)?;
        debug!("Stored {} files for {}", snapshot.files.len(), snapshot.key);
        Ok(())
    }
}
