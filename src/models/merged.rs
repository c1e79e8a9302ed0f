//! Merged leaderboard rows - the table row model with the change column.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{GroupKey, RankEntry};

/// Rank movement relative to the historic snapshot.
///
/// Serialized as a bare signed integer, or the string `"new"` when the
/// group had no counterpart in the historic snapshot. Positive means the
/// group improved (moved to a numerically smaller rank).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankChange {
    Moved(i64),
    New,
}

impl RankChange {
    /// The signed delta, when the group existed in the historic snapshot.
    pub fn delta(&self) -> Option<i64> {
        match self {
            RankChange::Moved(n) => Some(*n),
            RankChange::New => None,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, RankChange::New)
    }

    /// Whether the group moved up the ladder.
    pub fn is_improvement(&self) -> bool {
        matches!(self, RankChange::Moved(n) if *n > 0)
    }
}

impl fmt::Display for RankChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankChange::Moved(n) if *n > 0 => write!(f, "+{}", n),
            RankChange::Moved(n) => write!(f, "{}", n),
            RankChange::New => write!(f, "new"),
        }
    }
}

impl Serialize for RankChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RankChange::Moved(n) => serializer.serialize_i64(*n),
            RankChange::New => serializer.serialize_str("new"),
        }
    }
}

struct RankChangeVisitor;

impl Visitor<'_> for RankChangeVisitor {
    type Value = RankChange;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a signed integer or the string \"new\"")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RankChange, E> {
        Ok(RankChange::Moved(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RankChange, E> {
        i64::try_from(v)
            .map(RankChange::Moved)
            .map_err(|_| E::custom(format!("rank change out of range: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RankChange, E> {
        if v == "new" {
            Ok(RankChange::New)
        } else {
            Err(E::custom(format!("unexpected rank change: {v:?}")))
        }
    }
}

impl<'de> Deserialize<'de> for RankChange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RankChangeVisitor)
    }
}

/// One leaderboard table row: a current rank entry plus its movement
/// against the historic snapshot.
///
/// Rows are display-only: they are built fresh on every merge and carry no
/// identity of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    #[serde(flatten)]
    pub entry: RankEntry,

    pub change: RankChange,
}

impl MergedRow {
    /// Identity of the row's group.
    pub fn group_key(&self) -> GroupKey {
        self.entry.group_key()
    }
}
