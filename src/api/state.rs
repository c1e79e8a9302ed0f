use std::sync::Arc;

use crate::storage::{SnapshotCache, SnapshotStore, StorageConfig};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub cache: Arc<tokio::sync::RwLock<SnapshotCache>>,
}

impl AppState {
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            store: Arc::new(SnapshotStore::new(storage)),
            cache: Arc::new(tokio::sync::RwLock::new(SnapshotCache::new())),
        }
    }
}
