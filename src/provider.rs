//! Snapshot provider abstraction.
//!
//! A provider supplies `Option<RankSnapshot>` for a (day, partition) pair.
//! Absence is a defined state, not an error: the day may simply never have
//! been captured. Backends: the remote document store over HTTP, and the
//! local snapshot store.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::fetch::{FetchError, Fetcher};
use crate::ingest::LadderDocument;
use crate::models::{LadderPartition, RankSnapshot, SnapshotDay, SnapshotError};
use crate::storage::{SnapshotStore, StorageError};

/// Errors a provider can surface.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Document failed validation: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Invalid snapshot URL: {0}")]
    InvalidUrl(String),
}

/// Trait for snapshot sources.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Fetch the snapshot for a (day, partition), if one was captured.
    async fn snapshot(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Option<RankSnapshot>, ProviderError>;

    /// Check if the source is reachable.
    async fn health_check(&self) -> Result<bool, ProviderError>;
}

/// Remote document store over HTTP.
///
/// Documents live at `<base>/ladders/<day>/<type>/<faction>.json`.
pub struct HttpSnapshotProvider {
    fetcher: Fetcher,
    base_url: Url,
}

impl HttpSnapshotProvider {
    pub fn new(fetcher: Fetcher, base_url: Url) -> Self {
        Self { fetcher, base_url }
    }

    fn document_url(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Url, ProviderError> {
        let path = format!("ladders/{}/{}.json", day.timestamp(), partition.path());
        self.base_url
            .join(&path)
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl SnapshotProvider for HttpSnapshotProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn snapshot(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Option<RankSnapshot>, ProviderError> {
        let url = self.document_url(day, partition)?;
        let result = match self.fetcher.fetch(&url).await {
            Ok(result) => result,
            Err(e) if e.is_not_found() => {
                debug!("No remote snapshot at {}", url);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let document: LadderDocument = self.fetcher.read_json(&result).await?;
        Ok(Some(document.into_snapshot(partition, day)?))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        match self.fetcher.fetch_fresh(&self.base_url).await {
            Ok(_) => Ok(true),
            // Any HTTP answer means the store is up, even if the root path
            // is not itself a document.
            Err(FetchError::HttpStatus { .. }) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

/// Local snapshot store as a provider.
pub struct LocalSnapshotProvider {
    store: SnapshotStore,
}

impl LocalSnapshotProvider {
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SnapshotProvider for LocalSnapshotProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn snapshot(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Option<RankSnapshot>, ProviderError> {
        Ok(self.store.read(day, partition)?)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

/// A fixed in-memory set of snapshots, for tests and offline demos.
#[derive(Default)]
pub struct StaticSnapshotProvider {
    snapshots: HashMap<(SnapshotDay, LadderPartition), RankSnapshot>,
}

impl StaticSnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot: RankSnapshot) -> Self {
        self.snapshots
            .insert((snapshot.day(), snapshot.partition()), snapshot);
        self
    }
}

#[async_trait]
impl SnapshotProvider for StaticSnapshotProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn snapshot(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Option<RankSnapshot>, ProviderError> {
        Ok(self.snapshots.get(&(day, partition)).cloned())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
