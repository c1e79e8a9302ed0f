//! Filesystem data lake operations.
//!
//! Handles reading and writing to the local data lake:
//! - Raw fetched snapshot documents
//! - Normalized per-partition snapshot JSONL files
//! - Parquet analytics exports

mod cache;
mod jsonl;
mod parquet;
mod snapshots;

pub use cache::*;
pub use jsonl::*;
pub use parquet::*;
pub use snapshots::*;

use std::path::PathBuf;
use thiserror::Error;

use crate::models::SnapshotError;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stored snapshot is corrupt: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Raw fetched documents (the HTTP cache).
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// Normalized snapshots, one directory per capture day.
    pub fn ladders_dir(&self) -> PathBuf {
        self.data_dir.join("ladders")
    }

    /// Derived analytics files (Parquet exports).
    pub fn derived_dir(&self) -> PathBuf {
        self.data_dir.join("derived")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_paths() {
        let config = StorageConfig::new(PathBuf::from("/data"));

        assert_eq!(config.raw_dir(), PathBuf::from("/data/raw"));
        assert_eq!(config.ladders_dir(), PathBuf::from("/data/ladders"));
        assert_eq!(config.derived_dir(), PathBuf::from("/data/derived"));
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }
}
