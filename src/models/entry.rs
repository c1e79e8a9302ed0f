//! Rank entry model - one group's standing at a point in time.

use serde::{Deserialize, Serialize};

use super::GroupKey;

/// One member of a ranked group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Stable profile identifier in the upstream player database.
    pub profile_id: String,

    /// Display name at capture time.
    pub alias: String,

    /// ISO country code for the flag column.
    pub country: String,
}

impl Member {
    /// Create a new member.
    pub fn new(
        profile_id: impl Into<String>,
        alias: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            alias: alias.into(),
            country: country.into(),
        }
    }
}

/// One group's ladder standing at a point in time.
///
/// Field names on the wire match the upstream document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    /// Position on the ladder (1 = best), unique and dense within a snapshot.
    pub rank: u32,

    /// Skill tier.
    #[serde(rename = "ranklevel")]
    pub rank_level: u32,

    /// Group members, at least one.
    pub members: Vec<Member>,

    /// Consecutive wins (positive) or losses (negative).
    pub streak: i32,

    pub wins: u32,

    pub losses: u32,

    /// Matches abandoned before completion.
    pub drops: u32,

    pub disputes: u32,

    /// Unix timestamp (seconds) of the group's most recent match.
    #[serde(rename = "lastmatchdate")]
    pub last_match_date: i64,
}

impl RankEntry {
    /// Identity key of this group, stable across snapshots.
    pub fn group_key(&self) -> GroupKey {
        GroupKey::from_profile_ids(self.members.iter().map(|m| m.profile_id.as_str()))
    }

    /// Total completed matches.
    pub fn total_games(&self) -> u32 {
        self.wins + self.losses
    }

    /// Win ratio as a whole percentage, rounded. Zero when no games played.
    pub fn win_ratio_percent(&self) -> u32 {
        let total = self.total_games();
        if total == 0 {
            0
        } else {
            (100.0 * self.wins as f64 / total as f64).round() as u32
        }
    }

    /// Comma-separated member aliases, for single-line display.
    pub fn alias_line(&self) -> String {
        self.members
            .iter()
            .map(|m| m.alias.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
