use axum::Json;
use serde::Serialize;

use crate::models::{Faction, GameType};

#[derive(Debug, Serialize)]
pub struct GameTypeInfo {
    pub id: &'static str,
    pub team_game: bool,
    pub factions: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SelectionDefaults {
    #[serde(rename = "type")]
    pub game_type: &'static str,
    pub race: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub version: &'static str,
    pub defaults: SelectionDefaults,
    pub game_types: Vec<GameTypeInfo>,
}

/// The partition metadata the type and race dropdowns are built from.
pub async fn get_meta() -> Json<MetaResponse> {
    let game_types = GameType::ALL
        .iter()
        .map(|gt| GameTypeInfo {
            id: gt.as_str(),
            team_game: gt.is_team_game(),
            factions: Faction::for_game_type(*gt)
                .iter()
                .map(|f| f.as_str())
                .collect(),
        })
        .collect();

    Json(MetaResponse {
        version: env!("CARGO_PKG_VERSION"),
        defaults: SelectionDefaults {
            game_type: GameType::OneVsOne.as_str(),
            race: Faction::Soviet.as_str(),
        },
        game_types,
    })
}
