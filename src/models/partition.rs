//! Ladder partitions - the (game type, faction) axes a snapshot is captured for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Partition parsing and validation errors.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("unknown game type: {0}")]
    UnknownGameType(String),

    #[error("unknown faction: {0}")]
    UnknownFaction(String),

    #[error("faction {faction} is not valid for game type {game_type}")]
    InvalidCombination { game_type: GameType, faction: Faction },
}

/// Ladder game type.
///
/// The four numbered sizes are random-match ladders where every member is
/// ranked solo; the `team*` types are arranged-team ladders where the whole
/// team is the ranked group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    #[serde(rename = "1v1")]
    OneVsOne,
    #[serde(rename = "2v2")]
    TwoVsTwo,
    #[serde(rename = "3v3")]
    ThreeVsThree,
    #[serde(rename = "4v4")]
    FourVsFour,
    #[serde(rename = "team2")]
    TeamOfTwo,
    #[serde(rename = "team3")]
    TeamOfThree,
    #[serde(rename = "team4")]
    TeamOfFour,
}

impl GameType {
    /// All game types, in display order.
    pub const ALL: [GameType; 7] = [
        GameType::OneVsOne,
        GameType::TwoVsTwo,
        GameType::ThreeVsThree,
        GameType::FourVsFour,
        GameType::TeamOfTwo,
        GameType::TeamOfThree,
        GameType::TeamOfFour,
    ];

    /// The identifier used in query strings and storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::OneVsOne => "1v1",
            GameType::TwoVsTwo => "2v2",
            GameType::ThreeVsThree => "3v3",
            GameType::FourVsFour => "4v4",
            GameType::TeamOfTwo => "team2",
            GameType::TeamOfThree => "team3",
            GameType::TeamOfFour => "team4",
        }
    }

    /// Whether this is an arranged-team ladder.
    pub fn is_team_game(&self) -> bool {
        matches!(
            self,
            GameType::TeamOfTwo | GameType::TeamOfThree | GameType::TeamOfFour
        )
    }

    /// Number of players on one side of a match.
    pub fn team_size(&self) -> u32 {
        match self {
            GameType::OneVsOne => 1,
            GameType::TwoVsTwo | GameType::TeamOfTwo => 2,
            GameType::ThreeVsThree | GameType::TeamOfThree => 3,
            GameType::FourVsFour | GameType::TeamOfFour => 4,
        }
    }

    /// Number of members one ranked group carries on this ladder.
    ///
    /// Random ladders rank individual players; arranged-team ladders rank
    /// the full team.
    pub fn expected_members(&self) -> u32 {
        if self.is_team_game() {
            self.team_size()
        } else {
            1
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameType {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1v1" => Ok(GameType::OneVsOne),
            "2v2" => Ok(GameType::TwoVsTwo),
            "3v3" => Ok(GameType::ThreeVsThree),
            "4v4" => Ok(GameType::FourVsFour),
            "team2" => Ok(GameType::TeamOfTwo),
            "team3" => Ok(GameType::TeamOfThree),
            "team4" => Ok(GameType::TeamOfFour),
            other => Err(PartitionError::UnknownGameType(other.to_string())),
        }
    }
}

/// Faction a ladder partition is captured for.
///
/// Random ladders track the five playable factions individually; arranged
/// team ladders only distinguish the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Wehrmacht,
    #[serde(rename = "wgerman")]
    WestGerman,
    Soviet,
    Usf,
    British,
    Axis,
    Allies,
}

impl Faction {
    /// Factions valid for random-match ladders.
    pub const SOLO: [Faction; 5] = [
        Faction::Wehrmacht,
        Faction::WestGerman,
        Faction::Soviet,
        Faction::Usf,
        Faction::British,
    ];

    /// Factions valid for arranged-team ladders.
    pub const TEAM: [Faction; 2] = [Faction::Axis, Faction::Allies];

    /// The identifier used in query strings and storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Faction::Wehrmacht => "wehrmacht",
            Faction::WestGerman => "wgerman",
            Faction::Soviet => "soviet",
            Faction::Usf => "usf",
            Faction::British => "british",
            Faction::Axis => "axis",
            Faction::Allies => "allies",
        }
    }

    /// Whether this is one of the two team-ladder sides.
    pub fn is_team_side(&self) -> bool {
        matches!(self, Faction::Axis | Faction::Allies)
    }

    /// The factions selectable for a given game type.
    pub fn for_game_type(game_type: GameType) -> &'static [Faction] {
        if game_type.is_team_game() {
            &Self::TEAM
        } else {
            &Self::SOLO
        }
    }

    /// Whether this faction can be combined with the given game type.
    pub fn valid_for(&self, game_type: GameType) -> bool {
        self.is_team_side() == game_type.is_team_game()
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Faction {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wehrmacht" => Ok(Faction::Wehrmacht),
            "wgerman" => Ok(Faction::WestGerman),
            "soviet" => Ok(Faction::Soviet),
            "usf" => Ok(Faction::Usf),
            "british" => Ok(Faction::British),
            "axis" => Ok(Faction::Axis),
            "allies" => Ok(Faction::Allies),
            other => Err(PartitionError::UnknownFaction(other.to_string())),
        }
    }
}

/// One ladder partition: a (game type, faction) pair.
///
/// Two snapshots are only comparable when they were captured for the same
/// partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LadderPartition {
    pub game_type: GameType,
    pub faction: Faction,
}

impl LadderPartition {
    /// Create a partition, rejecting invalid game-type/faction pairings.
    pub fn new(game_type: GameType, faction: Faction) -> Result<Self, PartitionError> {
        if !faction.valid_for(game_type) {
            return Err(PartitionError::InvalidCombination { game_type, faction });
        }
        Ok(Self { game_type, faction })
    }

    /// All valid partitions, in display order.
    pub fn all() -> Vec<LadderPartition> {
        let mut partitions = Vec::new();
        for game_type in GameType::ALL {
            for faction in Faction::for_game_type(game_type) {
                partitions.push(LadderPartition {
                    game_type,
                    faction: *faction,
                });
            }
        }
        partitions
    }

    /// Relative storage path segment, e.g. `1v1/soviet`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.game_type.as_str(), self.faction.as_str())
    }
}

impl fmt::Display for LadderPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.game_type, self.faction)
    }
}
