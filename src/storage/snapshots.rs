//! Snapshot store - the normalized snapshot layout on disk.
//!
//! One snapshot lives at `ladders/<day>/<type>/<faction>.jsonl` (rank
//! entries, one per line) with a `<faction>.meta.json` sidecar carrying the
//! fields that do not belong to any single entry.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{JsonlReader, JsonlWriter, StorageConfig, StorageError};
use crate::models::{
    Faction, GameType, LadderPartition, RankEntry, RankSnapshot, SnapshotDay,
};

/// Sidecar metadata stored next to a snapshot's entry file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub rank_total: u32,
    pub game_type: GameType,
    pub faction: Faction,
    pub day: SnapshotDay,
    pub captured_at: DateTime<Utc>,
}

/// Read/write access to the normalized snapshot layout.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    config: StorageConfig,
}

impl SnapshotStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Path of a snapshot's entry file.
    pub fn entries_path(&self, day: SnapshotDay, partition: LadderPartition) -> PathBuf {
        self.config
            .ladders_dir()
            .join(day.timestamp().to_string())
            .join(partition.game_type.as_str())
            .join(format!("{}.jsonl", partition.faction.as_str()))
    }

    /// Path of a snapshot's metadata sidecar.
    pub fn meta_path(&self, day: SnapshotDay, partition: LadderPartition) -> PathBuf {
        self.config
            .ladders_dir()
            .join(day.timestamp().to_string())
            .join(partition.game_type.as_str())
            .join(format!("{}.meta.json", partition.faction.as_str()))
    }

    /// Whether a snapshot is stored for this (day, partition).
    pub fn exists(&self, day: SnapshotDay, partition: LadderPartition) -> bool {
        self.entries_path(day, partition).exists()
    }

    /// Persist a snapshot, replacing any previous capture of the same
    /// (day, partition).
    pub fn write(&self, snapshot: &RankSnapshot) -> Result<(), StorageError> {
        let day = snapshot.day();
        let partition = snapshot.partition();

        let writer: JsonlWriter<RankEntry> =
            JsonlWriter::new(self.entries_path(day, partition));
        let count = writer.write_all(snapshot.entries())?;

        let meta = SnapshotMeta {
            rank_total: snapshot.rank_total(),
            game_type: partition.game_type,
            faction: partition.faction,
            day,
            captured_at: Utc::now(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)?;
        fs::write(self.meta_path(day, partition), meta_json)?;

        info!("Stored snapshot {} {} ({} entries)", day, partition, count);
        Ok(())
    }

    /// Load a snapshot. Returns `Ok(None)` when nothing is stored for the
    /// (day, partition); a stored snapshot that fails validation is an error.
    pub fn read(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Option<RankSnapshot>, StorageError> {
        let entries_path = self.entries_path(day, partition);
        if !entries_path.exists() {
            return Ok(None);
        }

        let reader: JsonlReader<RankEntry> = JsonlReader::new(entries_path);
        let entries = reader.read_all()?;

        let rank_total = match self.read_meta(day, partition)? {
            Some(meta) => {
                if meta.game_type != partition.game_type || meta.faction != partition.faction {
                    warn!(
                        "Snapshot sidecar disagrees with its path: {:?} at {} {}",
                        meta, day, partition
                    );
                }
                meta.rank_total
            }
            None => {
                warn!(
                    "Snapshot {} {} has no metadata sidecar, assuming rank_total = {}",
                    day,
                    partition,
                    entries.len()
                );
                entries.len() as u32
            }
        };

        let snapshot = RankSnapshot::from_entries(partition, day, entries, rank_total)?;
        Ok(Some(snapshot))
    }

    /// Load a snapshot's metadata sidecar.
    pub fn read_meta(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Option<SnapshotMeta>, StorageError> {
        let path = self.meta_path(day, partition);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Days with at least one stored snapshot, ascending.
    pub fn list_days(&self) -> Result<Vec<SnapshotDay>, StorageError> {
        let dir = self.config.ladders_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut days = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().to_str().map(str::parse::<i64>) {
                Some(Ok(ts)) => days.push(SnapshotDay::from_timestamp(ts)),
                _ => warn!("Ignoring non-day directory {:?}", entry.path()),
            }
        }

        days.sort();
        Ok(days)
    }

    /// Partitions stored for a given day, in display order.
    pub fn list_partitions(
        &self,
        day: SnapshotDay,
    ) -> Result<Vec<LadderPartition>, StorageError> {
        let day_dir = self.config.ladders_dir().join(day.timestamp().to_string());
        if !day_dir.exists() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for type_entry in fs::read_dir(&day_dir)? {
            let type_entry = type_entry?;
            if !type_entry.file_type()?.is_dir() {
                continue;
            }
            let Some(game_type) = type_entry
                .file_name()
                .to_str()
                .and_then(|s| GameType::from_str(s).ok())
            else {
                warn!("Ignoring unknown game type directory {:?}", type_entry.path());
                continue;
            };

            for file in fs::read_dir(type_entry.path())? {
                let file = file?;
                let name = file.file_name();
                let Some(name) = name.to_str() else { continue };
                let Some(faction_str) = name.strip_suffix(".jsonl") else {
                    continue;
                };
                match Faction::from_str(faction_str)
                    .ok()
                    .and_then(|f| LadderPartition::new(game_type, f).ok())
                {
                    Some(partition) => found.push(partition),
                    None => warn!("Ignoring unknown snapshot file {:?}", file.path()),
                }
            }
        }

        // Display order, not directory order.
        let order = LadderPartition::all();
        found.sort_by_key(|p| order.iter().position(|o| o == p));
        Ok(found)
    }
}
