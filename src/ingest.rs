//! Snapshot document ingestion.
//!
//! Parses the document store's wire format into validated snapshots and
//! writes them into the local store.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{LadderPartition, RankEntry, RankSnapshot, SnapshotDay, SnapshotError};
use crate::storage::{SnapshotStore, StorageError};

/// Errors that can occur during ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document failed validation: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One snapshot document as the remote store serves it: the ranked top
/// slice of a partition plus the size of the full ranked population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderDocument {
    #[serde(rename = "rankTotal")]
    pub rank_total: u32,

    pub data: Vec<RankEntry>,
}

impl LadderDocument {
    /// Parse a document from its JSON text.
    pub fn parse(json: &str) -> Result<Self, IngestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate this document into a snapshot for the given (day, partition).
    ///
    /// Rejects dense-rank violations, memberless entries and identity
    /// collisions; those mean the upstream capture is corrupt.
    pub fn into_snapshot(
        self,
        partition: LadderPartition,
        day: SnapshotDay,
    ) -> Result<RankSnapshot, SnapshotError> {
        let expected = partition.game_type.expected_members() as usize;
        for entry in &self.data {
            if !entry.members.is_empty() && entry.members.len() != expected {
                warn!(
                    "Rank {} on {} carries {} members, expected {}",
                    entry.rank,
                    partition,
                    entry.members.len(),
                    expected
                );
            }
        }

        RankSnapshot::from_entries(partition, day, self.data, self.rank_total)
    }
}

/// Result of importing one document.
#[derive(Debug)]
pub struct IngestResult {
    pub entries: usize,
    pub rank_total: u32,
}

/// Import a snapshot document file into the store.
pub fn import_file(
    path: &Path,
    partition: LadderPartition,
    day: SnapshotDay,
    store: &SnapshotStore,
    dry_run: bool,
) -> Result<IngestResult, IngestError> {
    let content = std::fs::read_to_string(path)?;
    let document = LadderDocument::parse(&content)?;
    let snapshot = document.into_snapshot(partition, day)?;

    let result = IngestResult {
        entries: snapshot.len(),
        rank_total: snapshot.rank_total(),
    };

    if dry_run {
        info!(
            "Dry run: {} {} would store {} entries",
            day, partition, result.entries
        );
    } else {
        store.write(&snapshot)?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Faction, GameType};
    use crate::storage::StorageConfig;
    use tempfile::TempDir;

    fn partition() -> LadderPartition {
        LadderPartition::new(GameType::OneVsOne, Faction::Wehrmacht).unwrap()
    }

    fn day() -> SnapshotDay {
        SnapshotDay::from_timestamp(1_615_161_600)
    }

    const SAMPLE_DOCUMENT: &str = r#"{
        "rankTotal": 1873,
        "data": [
            {
                "rank": 1,
                "ranklevel": 20,
                "members": [{"profile_id": "310", "alias": "feldwebel", "country": "de"}],
                "streak": 7,
                "wins": 214,
                "losses": 96,
                "drops": 3,
                "disputes": 0,
                "lastmatchdate": 1615199000
            },
            {
                "rank": 2,
                "ranklevel": 19,
                "members": [{"profile_id": "644", "alias": "oberst", "country": "at"}],
                "streak": -2,
                "wins": 180,
                "losses": 120,
                "drops": 1,
                "disputes": 1,
                "lastmatchdate": 1615198000
            }
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let doc = LadderDocument::parse(SAMPLE_DOCUMENT).unwrap();
        assert_eq!(doc.rank_total, 1873);
        assert_eq!(doc.data.len(), 2);
        assert_eq!(doc.data[0].members[0].alias, "feldwebel");
    }

    #[test]
    fn test_parse_invalid_document() {
        assert!(LadderDocument::parse("{\"data\": []}").is_err()); // missing rankTotal
        assert!(LadderDocument::parse("not json").is_err());
    }

    #[test]
    fn test_document_into_snapshot() {
        let doc = LadderDocument::parse(SAMPLE_DOCUMENT).unwrap();
        let snapshot = doc.into_snapshot(partition(), day()).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.rank_total(), 1873);
        assert_eq!(snapshot.partition(), partition());
    }

    #[test]
    fn test_document_validation_rejects_gap() {
        let mut doc = LadderDocument::parse(SAMPLE_DOCUMENT).unwrap();
        doc.data[1].rank = 5;
        assert!(doc.into_snapshot(partition(), day()).is_err());
    }

    #[test]
    fn test_import_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(StorageConfig::new(temp_dir.path().join("data")));

        let doc_path = temp_dir.path().join("soviet.json");
        std::fs::write(&doc_path, SAMPLE_DOCUMENT).unwrap();

        let result = import_file(&doc_path, partition(), day(), &store, false).unwrap();
        assert_eq!(result.entries, 2);
        assert_eq!(result.rank_total, 1873);

        let stored = store.read(day(), partition()).unwrap().unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_import_file_dry_run_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(StorageConfig::new(temp_dir.path().join("data")));

        let doc_path = temp_dir.path().join("soviet.json");
        std::fs::write(&doc_path, SAMPLE_DOCUMENT).unwrap();

        let result = import_file(&doc_path, partition(), day(), &store, true).unwrap();
        assert_eq!(result.entries, 2);
        assert!(store.read(day(), partition()).unwrap().is_none());
    }
}
