//! Latest-known-snapshot cache.
//!
//! The merge is recomputed from cached snapshots on every request rather
//! than diffed incrementally; a snapshot holds at most a few hundred
//! entries.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{SnapshotStore, StorageError};
use crate::models::{LadderPartition, RankSnapshot, SnapshotDay};

/// In-memory cache of the latest known snapshot per (day, partition).
#[derive(Debug, Default)]
pub struct SnapshotCache {
    map: HashMap<(SnapshotDay, LadderPartition), Arc<RankSnapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot for a (day, partition), if any.
    pub fn get(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Option<Arc<RankSnapshot>> {
        self.map.get(&(day, partition)).cloned()
    }

    /// Replace the cached snapshot for its (day, partition).
    pub fn insert(&mut self, snapshot: RankSnapshot) -> Arc<RankSnapshot> {
        let key = (snapshot.day(), snapshot.partition());
        let arc = Arc::new(snapshot);
        self.map.insert(key, arc.clone());
        arc
    }

    /// Drop a cached snapshot, e.g. after a fresh pull replaced it on disk.
    pub fn invalidate(&mut self, day: SnapshotDay, partition: LadderPartition) {
        if self.map.remove(&(day, partition)).is_some() {
            debug!("Invalidated cached snapshot {} {}", day, partition);
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Read-through load: cache hit, or read the store and cache the
    /// result. `Ok(None)` when the store has no snapshot for the key.
    pub fn get_or_load(
        &mut self,
        store: &SnapshotStore,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Option<Arc<RankSnapshot>>, StorageError> {
        if let Some(hit) = self.get(day, partition) {
            return Ok(Some(hit));
        }

        match store.read(day, partition)? {
            Some(snapshot) => Ok(Some(self.insert(snapshot))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Faction, GameType, Member, RankEntry};
    use crate::storage::StorageConfig;
    use tempfile::TempDir;

    fn partition() -> LadderPartition {
        LadderPartition::new(GameType::OneVsOne, Faction::Usf).unwrap()
    }

    fn day() -> SnapshotDay {
        SnapshotDay::from_timestamp(1_615_161_600)
    }

    fn snapshot() -> RankSnapshot {
        let entries = vec![RankEntry {
            rank: 1,
            rank_level: 20,
            members: vec![Member::new("1", "ace", "us")],
            streak: 10,
            wins: 90,
            losses: 10,
            drops: 0,
            disputes: 0,
            last_match_date: 1_615_200_000,
        }];
        RankSnapshot::from_entries(partition(), day(), entries, 100).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut cache = SnapshotCache::new();
        assert!(cache.get(day(), partition()).is_none());

        cache.insert(snapshot());
        let hit = cache.get(day(), partition()).unwrap();
        assert_eq!(hit.rank_total(), 100);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = SnapshotCache::new();
        cache.insert(snapshot());
        cache.invalidate(day(), partition());
        assert!(cache.get(day(), partition()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_load_reads_store_once() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(StorageConfig::new(temp_dir.path().to_path_buf()));
        store.write(&snapshot()).unwrap();

        let mut cache = SnapshotCache::new();
        let first = cache
            .get_or_load(&store, day(), partition())
            .unwrap()
            .unwrap();
        assert_eq!(first.len(), 1);

        // Remove the file; the cached copy must still serve.
        std::fs::remove_file(store.entries_path(day(), partition())).unwrap();
        let second = cache
            .get_or_load(&store, day(), partition())
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_get_or_load_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(StorageConfig::new(temp_dir.path().to_path_buf()));

        let mut cache = SnapshotCache::new();
        assert!(cache
            .get_or_load(&store, day(), partition())
            .unwrap()
            .is_none());
        assert!(cache.is_empty());
    }
}
