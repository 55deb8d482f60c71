//! In-memory [`SnapshotStore`] for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::RwLock;

use super::SnapshotStore;
use crate::domain::{Snapshot, SnapshotKey};
use crate::error::CacheError;

pub struct MemoryStore {
    snapshots: RwLock<HashMap<SnapshotKey, Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { snapshots: RwLock::new(HashMap::new()) }
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for MemoryStore {
    fn find_first(&self, key: &SnapshotKey) -> Result<Option<Snapshot>, CacheError> {
        let snapshots = self.snapshots.read().map_err(|_| CacheError::Poisoned)?;
        Ok(snapshots.get(key).cloned())
    }

    fn insert(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let mut snapshots = self.snapshots.write().map_err(|_| CacheError::Poisoned)?;
        snapshots.insert(snapshot.key.clone(), snapshot.clone());
        Ok(())
    }
}
