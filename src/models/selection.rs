//! Query-state selection - which two snapshots the page is looking at.
//!
//! The leaderboard pages carry their whole state in four query-string
//! parameters. Resolution is total: unparseable or missing values fall back
//! to the page defaults, and days clamp into the tracking window, so a
//! mangled URL still lands on a valid selection.

use chrono::NaiveDate;
use serde::Deserialize;

use super::{Faction, GameType, LadderPartition, SnapshotDay};

/// Raw query-string parameters, as the navigation layer supplies them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionParams {
    #[serde(rename = "timeStamp")]
    pub time_stamp: Option<String>,

    #[serde(rename = "historicTimeStamp")]
    pub historic_time_stamp: Option<String>,

    #[serde(rename = "type")]
    pub game_type: Option<String>,

    pub race: Option<String>,
}

/// A fully resolved snapshot selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderSelection {
    /// Day of the snapshot shown in the table.
    pub day: SnapshotDay,

    /// Day of the snapshot the change column compares against.
    pub historic_day: SnapshotDay,

    pub partition: LadderPartition,
}

impl LadderSelection {
    /// The default selection for a given "today": yesterday's 1v1 soviet
    /// ladder compared against the day before.
    pub fn default_for(today: NaiveDate) -> Self {
        let day = SnapshotDay::latest_allowed(today);
        Self {
            day,
            historic_day: day.pred().clamp_to_window(today),
            partition: LadderPartition {
                game_type: GameType::OneVsOne,
                faction: Faction::Soviet,
            },
        }
    }

    /// Resolve raw query parameters into a valid selection.
    pub fn resolve(params: &SelectionParams, today: NaiveDate) -> Self {
        let day = params
            .time_stamp
            .as_deref()
            .and_then(|s| s.parse::<SnapshotDay>().ok())
            .map(|d| d.clamp_to_window(today))
            .unwrap_or_else(|| SnapshotDay::latest_allowed(today));

        let historic_day = params
            .historic_time_stamp
            .as_deref()
            .and_then(|s| s.parse::<SnapshotDay>().ok())
            .map(|d| d.clamp_to_window(today))
            .unwrap_or_else(|| day.pred().clamp_to_window(today));

        let game_type = params
            .game_type
            .as_deref()
            .and_then(|s| s.parse::<GameType>().ok())
            .unwrap_or(GameType::OneVsOne);

        let faction = params
            .race
            .as_deref()
            .and_then(|s| s.parse::<Faction>().ok())
            .filter(|f| f.valid_for(game_type))
            .unwrap_or_else(|| Self::default_faction(game_type));

        Self {
            day,
            historic_day,
            partition: LadderPartition { game_type, faction },
        }
    }

    /// Fallback faction when the race parameter is missing or does not fit
    /// the selected game type.
    fn default_faction(game_type: GameType) -> Faction {
        if game_type.is_team_game() {
            Faction::Allies
        } else {
            Faction::Soviet
        }
    }
}
