//! Pull orchestrator.
//!
//! Coordinates the capture pipeline:
//! 1. Fetch snapshot documents from a provider
//! 2. Validate them into snapshots
//! 3. Store them in the local data lake

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::models::{LadderPartition, SnapshotDay};
use crate::provider::{ProviderError, SnapshotProvider};
use crate::storage::{SnapshotStore, StorageError};

/// Errors that can occur during a pull.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No partitions configured")]
    NoPartitions,

    #[error("Sync cancelled")]
    Cancelled,
}

/// Configuration for pull operations.
#[derive(Clone)]
pub struct SyncConfig {
    /// Days to pull.
    pub days: Vec<SnapshotDay>,

    /// Partitions to pull for each day.
    pub partitions: Vec<LadderPartition>,

    /// Pull interval for periodic mode.
    pub interval: Duration,

    /// How many top ranks a capture is expected to hold.
    pub rank_cutoff: u32,

    /// Fetch and validate but don't store.
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            days: Vec::new(),
            partitions: LadderPartition::all(),
            interval: Duration::from_secs(6 * 3600), // 6 hours
            rank_cutoff: 200,
            dry_run: false,
        }
    }
}

/// Status of the last pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// State of pull operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    /// When the last pull started
    pub last_sync_started: Option<DateTime<Utc>>,

    /// When the last pull completed
    pub last_sync_completed: Option<DateTime<Utc>>,

    /// Last pull status
    pub last_sync_status: SyncStatus,

    /// Snapshots stored in the last run
    pub snapshots_synced: u32,

    /// Keys the provider had no document for
    pub snapshots_missing: u32,

    /// Errors encountered
    pub errors: Vec<String>,
}

/// Result of one pull run.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub snapshots_synced: u32,
    pub snapshots_missing: u32,
    pub entries_synced: u64,
    pub errors: Vec<String>,
    pub duration: Duration,
}

/// Pull orchestrator.
pub struct SyncOrchestrator {
    config: SyncConfig,
    provider: Arc<dyn SnapshotProvider>,
    store: SnapshotStore,
    state: Arc<RwLock<SyncState>>,
    cancel_token: Arc<RwLock<bool>>,
}

impl SyncOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: SyncConfig,
        provider: Arc<dyn SnapshotProvider>,
        store: SnapshotStore,
    ) -> Self {
        Self {
            config,
            provider,
            store,
            state: Arc::new(RwLock::new(SyncState::default())),
            cancel_token: Arc::new(RwLock::new(false)),
        }
    }

    /// Get current pull state.
    pub async fn state(&self) -> SyncState {
        self.state.read().await.clone()
    }

    /// Request cancellation of the current pull.
    pub async fn cancel(&self) {
        *self.cancel_token.write().await = true;
    }

    /// Run a single pull over every configured (day, partition).
    pub async fn sync_once(&self) -> Result<SyncResult, SyncError> {
        if self.config.partitions.is_empty() {
            return Err(SyncError::NoPartitions);
        }

        *self.cancel_token.write().await = false;

        {
            let mut state = self.state.write().await;
            state.last_sync_started = Some(Utc::now());
            state.last_sync_status = SyncStatus::Running;
            state.errors.clear();
        }

        let start = std::time::Instant::now();
        info!(
            "Starting pull from '{}': {} day(s) x {} partition(s)",
            self.provider.name(),
            self.config.days.len(),
            self.config.partitions.len()
        );

        let mut synced = 0u32;
        let mut missing = 0u32;
        let mut entries = 0u64;
        let mut errors = Vec::new();

        for &day in &self.config.days {
            for &partition in &self.config.partitions {
                if *self.cancel_token.read().await {
                    warn!("Pull cancelled");
                    return Err(SyncError::Cancelled);
                }

                match self.pull_one(day, partition).await {
                    Ok(Some(count)) => {
                        synced += 1;
                        entries += count as u64;
                    }
                    Ok(None) => missing += 1,
                    Err(e) => {
                        error!("Failed to pull {} {}: {}", day, partition, e);
                        errors.push(format!("{} {}: {}", day, partition, e));
                    }
                }
            }
        }

        let duration = start.elapsed();

        {
            let mut state = self.state.write().await;
            state.last_sync_completed = Some(Utc::now());
            state.last_sync_status = if errors.is_empty() {
                SyncStatus::Completed
            } else {
                SyncStatus::Failed
            };
            state.snapshots_synced = synced;
            state.snapshots_missing = missing;
            state.errors = errors.clone();
        }

        info!(
            "Pull completed: {} snapshots ({} entries), {} missing in {:?}",
            synced, entries, missing, duration
        );

        Ok(SyncResult {
            snapshots_synced: synced,
            snapshots_missing: missing,
            entries_synced: entries,
            errors,
            duration,
        })
    }

    /// Pull one (day, partition). Returns the entry count, or None when the
    /// provider has no document for the key.
    async fn pull_one(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Option<usize>, SyncError> {
        let Some(snapshot) = self.provider.snapshot(day, partition).await? else {
            return Ok(None);
        };

        let count = snapshot.len();
        if count as u32 > self.config.rank_cutoff {
            warn!(
                "{} {} holds {} entries, beyond the expected cutoff of {}",
                day, partition, count, self.config.rank_cutoff
            );
        }
        if self.config.dry_run {
            info!(
                "Dry run: {} {} would store {} entries",
                day, partition, count
            );
        } else {
            self.store.write(&snapshot)?;
        }
        Ok(Some(count))
    }

    /// Run pulls forever at the configured interval.
    pub async fn run_periodic(self: Arc<Self>) {
        let mut ticker = interval(self.config.interval);

        loop {
            ticker.tick().await;
            match self.sync_once().await {
                Ok(result) => {
                    if !result.errors.is_empty() {
                        warn!("Pull finished with {} errors", result.errors.len());
                    }
                }
                Err(SyncError::Cancelled) => {
                    info!("Periodic pull stopped");
                    return;
                }
                Err(e) => error!("Pull failed: {}", e),
            }
        }
    }
}
