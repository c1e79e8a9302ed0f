//! Parquet exports for analytics.
//!
//! Parquet files are derived from the stored snapshots for fast analytical
//! queries over many days; they can always be rebuilt from source JSONL.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Int32Array, Int64Array, StringArray, TimestampSecondArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{debug, info};

use super::{StorageConfig, StorageError};
use crate::models::{LadderPartition, RankSnapshot, SnapshotDay};

/// Schema definitions for Parquet tables.
pub mod schemas {
    use super::*;

    /// Schema for the ladder table: one row per rank entry.
    pub fn ladder_schema() -> Schema {
        Schema::new(vec![
            Field::new("day", DataType::Int64, false),
            Field::new("game_type", DataType::Utf8, false),
            Field::new("faction", DataType::Utf8, false),
            Field::new("rank", DataType::UInt32, false),
            Field::new("rank_level", DataType::UInt32, false),
            Field::new("group_key", DataType::Utf8, false),
            Field::new("aliases", DataType::Utf8, false),
            Field::new("member_count", DataType::UInt32, false),
            Field::new("streak", DataType::Int32, false),
            Field::new("wins", DataType::UInt32, false),
            Field::new("losses", DataType::UInt32, false),
            Field::new("drops", DataType::UInt32, false),
            Field::new("disputes", DataType::UInt32, false),
            Field::new(
                "last_match_date",
                DataType::Timestamp(TimeUnit::Second, None),
                false,
            ),
            Field::new("rank_total", DataType::UInt32, false),
        ])
    }
}

/// Parquet file writer for snapshot exports.
pub struct ParquetWriter {
    config: StorageConfig,
}

impl ParquetWriter {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Export path for a snapshot, e.g. `derived/1615161600/1v1-soviet.parquet`.
    fn export_path(&self, day: SnapshotDay, partition: LadderPartition) -> PathBuf {
        self.config
            .derived_dir()
            .join(day.timestamp().to_string())
            .join(format!(
                "{}-{}.parquet",
                partition.game_type.as_str(),
                partition.faction.as_str()
            ))
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Export one snapshot to a Parquet file, returning its path.
    pub fn write_snapshot(&self, snapshot: &RankSnapshot) -> Result<PathBuf, StorageError> {
        let day = snapshot.day();
        let partition = snapshot.partition();
        let path = self.export_path(day, partition);
        self.ensure_dir(&path)?;

        let schema = Arc::new(schemas::ladder_schema());
        let entries = snapshot.entries();

        let days: Vec<i64> = entries.iter().map(|_| day.timestamp()).collect();
        let game_types: Vec<&str> = entries.iter().map(|_| partition.game_type.as_str()).collect();
        let factions: Vec<&str> = entries.iter().map(|_| partition.faction.as_str()).collect();
        let ranks: Vec<u32> = entries.iter().map(|e| e.rank).collect();
        let rank_levels: Vec<u32> = entries.iter().map(|e| e.rank_level).collect();
        let group_keys: Vec<String> = entries
            .iter()
            .map(|e| e.group_key().as_str().to_string())
            .collect();
        let aliases: Vec<String> = entries.iter().map(|e| e.alias_line()).collect();
        let member_counts: Vec<u32> = entries.iter().map(|e| e.members.len() as u32).collect();
        let streaks: Vec<i32> = entries.iter().map(|e| e.streak).collect();
        let wins: Vec<u32> = entries.iter().map(|e| e.wins).collect();
        let losses: Vec<u32> = entries.iter().map(|e| e.losses).collect();
        let drops: Vec<u32> = entries.iter().map(|e| e.drops).collect();
        let disputes: Vec<u32> = entries.iter().map(|e| e.disputes).collect();
        let last_matches: Vec<i64> = entries.iter().map(|e| e.last_match_date).collect();
        let rank_totals: Vec<u32> = entries.iter().map(|_| snapshot.rank_total()).collect();

        let group_key_refs: Vec<&str> = group_keys.iter().map(String::as_str).collect();
        let alias_refs: Vec<&str> = aliases.iter().map(String::as_str).collect();

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(days)) as ArrayRef,
                Arc::new(StringArray::from(game_types)) as ArrayRef,
                Arc::new(StringArray::from(factions)) as ArrayRef,
                Arc::new(UInt32Array::from(ranks)) as ArrayRef,
                Arc::new(UInt32Array::from(rank_levels)) as ArrayRef,
                Arc::new(StringArray::from(group_key_refs)) as ArrayRef,
                Arc::new(StringArray::from(alias_refs)) as ArrayRef,
                Arc::new(UInt32Array::from(member_counts)) as ArrayRef,
                Arc::new(Int32Array::from(streaks)) as ArrayRef,
                Arc::new(UInt32Array::from(wins)) as ArrayRef,
                Arc::new(UInt32Array::from(losses)) as ArrayRef,
                Arc::new(UInt32Array::from(drops)) as ArrayRef,
                Arc::new(UInt32Array::from(disputes)) as ArrayRef,
                Arc::new(TimestampSecondArray::from(last_matches)) as ArrayRef,
                Arc::new(UInt32Array::from(rank_totals)) as ArrayRef,
            ],
        )?;

        let file = File::create(&path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        info!("Exported {} rows to {:?}", entries.len(), path);
        Ok(path)
    }
}

/// Parquet file reader for verifying and consuming exports.
pub struct ParquetReader {
    config: StorageConfig,
}

impl ParquetReader {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn export_path(&self, day: SnapshotDay, partition: LadderPartition) -> PathBuf {
        self.config
            .derived_dir()
            .join(day.timestamp().to_string())
            .join(format!(
                "{}-{}.parquet",
                partition.game_type.as_str(),
                partition.faction.as_str()
            ))
    }

    /// Check if an export exists for a (day, partition).
    pub fn exists(&self, day: SnapshotDay, partition: LadderPartition) -> bool {
        self.export_path(day, partition).exists()
    }

    /// Read all record batches of an export. Missing export reads as empty.
    pub fn read_batches(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<Vec<RecordBatch>, StorageError> {
        let path = self.export_path(day, partition);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        debug!("Read {} batches from {:?}", batches.len(), path);
        Ok(batches)
    }

    /// Row count of an export.
    pub fn count(
        &self,
        day: SnapshotDay,
        partition: LadderPartition,
    ) -> Result<usize, StorageError> {
        let batches = self.read_batches(day, partition)?;
        Ok(batches.iter().map(|b| b.num_rows()).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Faction, GameType, Member, RankEntry};
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> StorageConfig {
        StorageConfig::new(temp_dir.path().to_path_buf())
    }

    fn partition() -> LadderPartition {
        LadderPartition::new(GameType::OneVsOne, Faction::British).unwrap()
    }

    fn snapshot() -> RankSnapshot {
        let entries = vec![
            RankEntry {
                rank: 1,
                rank_level: 16,
                members: vec![Member::new("100", "tommy", "gb")],
                streak: 4,
                wins: 70,
                losses: 30,
                drops: 1,
                disputes: 0,
                last_match_date: 1_615_200_000,
            },
            RankEntry {
                rank: 2,
                rank_level: 15,
                members: vec![Member::new("200", "sapper", "gb")],
                streak: -1,
                wins: 66,
                losses: 34,
                drops: 0,
                disputes: 2,
                last_match_date: 1_615_190_000,
            },
        ];
        RankSnapshot::from_entries(
            partition(),
            SnapshotDay::from_timestamp(1_615_161_600),
            entries,
            180,
        )
        .unwrap()
    }

    #[test]
    fn test_ladder_schema() {
        let schema = schemas::ladder_schema();
        assert_eq!(schema.fields().len(), 15);
        assert!(schema.field_with_name("group_key").is_ok());
        assert!(schema.field_with_name("rank_total").is_ok());
    }

    #[test]
    fn test_write_and_read_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let writer = ParquetWriter::new(config.clone());
        let reader = ParquetReader::new(config);

        let snapshot = snapshot();
        let path = writer.write_snapshot(&snapshot).unwrap();
        assert!(path.ends_with("derived/1615161600/1v1-british.parquet"));

        assert!(reader.exists(snapshot.day(), snapshot.partition()));
        assert_eq!(
            reader.count(snapshot.day(), snapshot.partition()).unwrap(),
            2
        );

        let batches = reader
            .read_batches(snapshot.day(), snapshot.partition())
            .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_columns(), 15);
    }

    #[test]
    fn test_read_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let reader = ParquetReader::new(test_config(&temp_dir));

        let day = SnapshotDay::from_timestamp(0);
        assert!(!reader.exists(day, partition()));
        assert!(reader.read_batches(day, partition()).unwrap().is_empty());
        assert_eq!(reader.count(day, partition()).unwrap(), 0);
    }
}
