//! Ranking snapshots - an immutable point-in-time capture of one partition.

use std::collections::HashMap;

use thiserror::Error;

use super::{GroupKey, LadderPartition, RankEntry, SnapshotDay};

/// Snapshot validation errors.
///
/// These are data-integrity defects in the upstream source, not runtime
/// conditions: a well-formed document never produces them.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("entry at rank {rank} has no members")]
    EmptyMembers { rank: u32 },

    #[error("duplicate rank {rank}")]
    DuplicateRank { rank: u32 },

    #[error("ranks are not dense: expected {expected}, found {found}")]
    RankGap { expected: u32, found: u32 },

    #[error("group {key} appears at both rank {first} and rank {second}")]
    IdentityCollision {
        key: GroupKey,
        first: u32,
        second: u32,
    },

    #[error("rank_total {rank_total} is smaller than the {entries} entries present")]
    RankTotalTooSmall { rank_total: u32, entries: usize },
}

/// An immutable ranking snapshot for one (day, partition).
///
/// Entries are held in rank order with an identity index on top. A snapshot
/// usually holds only the ladder's top slice; `rank_total` is the full
/// ranked population it was cut from.
#[derive(Debug, Clone)]
pub struct RankSnapshot {
    partition: LadderPartition,
    day: SnapshotDay,
    entries: Vec<RankEntry>,
    index: HashMap<GroupKey, usize>,
    rank_total: u32,
}

impl RankSnapshot {
    /// Build a snapshot, validating the snapshot invariants:
    /// ranks unique and dense from 1, every entry has members, group
    /// identities unique, `rank_total` covers the entries present.
    pub fn from_entries(
        partition: LadderPartition,
        day: SnapshotDay,
        mut entries: Vec<RankEntry>,
        rank_total: u32,
    ) -> Result<Self, SnapshotError> {
        entries.sort_by_key(|e| e.rank);

        if (rank_total as usize) < entries.len() {
            return Err(SnapshotError::RankTotalTooSmall {
                rank_total,
                entries: entries.len(),
            });
        }

        let mut index: HashMap<GroupKey, usize> = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.members.is_empty() {
                return Err(SnapshotError::EmptyMembers { rank: entry.rank });
            }

            let expected = i as u32 + 1;
            if entry.rank != expected {
                if i > 0 && entries[i - 1].rank == entry.rank {
                    return Err(SnapshotError::DuplicateRank { rank: entry.rank });
                }
                return Err(SnapshotError::RankGap {
                    expected,
                    found: entry.rank,
                });
            }

            let key = entry.group_key();
            if let Some(&first) = index.get(&key) {
                return Err(SnapshotError::IdentityCollision {
                    key,
                    first: entries[first].rank,
                    second: entry.rank,
                });
            }
            index.insert(key, i);
        }

        Ok(Self {
            partition,
            day,
            entries,
            index,
            rank_total,
        })
    }

    /// The partition this snapshot was captured for.
    pub fn partition(&self) -> LadderPartition {
        self.partition
    }

    /// The day this snapshot was captured on.
    pub fn day(&self) -> SnapshotDay {
        self.day
    }

    /// Size of the full ranked population this snapshot was cut from.
    pub fn rank_total(&self) -> u32 {
        self.rank_total
    }

    /// Entries in ascending rank order.
    pub fn entries(&self) -> &[RankEntry] {
        &self.entries
    }

    /// Number of entries in this snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a group's entry by identity.
    pub fn get(&self, key: &GroupKey) -> Option<&RankEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Look up a group's rank by identity.
    pub fn rank_of(&self, key: &GroupKey) -> Option<u32> {
        self.get(key).map(|e| e.rank)
    }
}
