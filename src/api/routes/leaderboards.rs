use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{ApiError, Pagination, PaginationMeta};
use crate::merge::merge_snapshots;
use crate::models::{
    Faction, GameType, LadderSelection, MergedRow, SelectionParams,
};

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    #[serde(rename = "timeStamp")]
    pub time_stamp: Option<String>,

    #[serde(rename = "historicTimeStamp")]
    pub historic_time_stamp: Option<String>,

    #[serde(rename = "type")]
    pub game_type: Option<String>,

    pub race: Option<String>,

    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// The resolved selection, echoed back so the page can sync its widgets
/// after defaults and clamping were applied.
#[derive(Debug, Serialize)]
pub struct SelectionEcho {
    #[serde(rename = "timeStamp")]
    pub time_stamp: i64,

    #[serde(rename = "historicTimeStamp")]
    pub historic_time_stamp: i64,

    #[serde(rename = "type")]
    pub game_type: GameType,

    pub race: Faction,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub selection: SelectionEcho,

    /// Size of the full ranked population; zero until the current snapshot
    /// is available.
    pub rank_total: u32,

    pub rows: Vec<MergedRow>,

    pub pagination: PaginationMeta,
}

/// Serve one merged leaderboard table.
///
/// The current and historic snapshots load independently; whichever of
/// them is missing, the merge still produces a well-defined result (empty
/// table, or all rows "new").
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let today = Utc::now().date_naive();
    let selection = LadderSelection::resolve(
        &SelectionParams {
            time_stamp: params.time_stamp,
            historic_time_stamp: params.historic_time_stamp,
            game_type: params.game_type,
            race: params.race,
        },
        today,
    );

    let (current, historic) = {
        let mut cache = state.cache.write().await;
        let current = cache
            .get_or_load(&state.store, selection.day, selection.partition)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let historic = cache
            .get_or_load(&state.store, selection.historic_day, selection.partition)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        (current, historic)
    };

    let rows = merge_snapshots(current.as_deref(), historic.as_deref());

    let pagination = Pagination::new(params.page, params.page_size);
    let total_items = rows.len() as u32;
    let meta = PaginationMeta::new(&pagination, total_items);

    let start = pagination.offset() as usize;
    let end = (start + pagination.page_size as usize).min(rows.len());
    let page_rows = if start < rows.len() {
        rows[start..end].to_vec()
    } else {
        Vec::new()
    };

    Ok(Json(LeaderboardResponse {
        selection: SelectionEcho {
            time_stamp: selection.day.timestamp(),
            historic_time_stamp: selection.historic_day.timestamp(),
            game_type: selection.partition.game_type,
            race: selection.partition.faction,
        },
        rank_total: current.map(|s| s.rank_total()).unwrap_or(0),
        rows: page_rows,
        pagination: meta,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        LadderPartition, Member, RankChange, RankEntry, RankSnapshot, SnapshotDay,
    };
    use crate::storage::StorageConfig;
    use tempfile::TempDir;

    fn partition() -> LadderPartition {
        LadderPartition::new(GameType::OneVsOne, Faction::Soviet).unwrap()
    }

    fn snapshot(day: SnapshotDay, ids: &[&str]) -> RankSnapshot {
        let entries = ids
            .iter()
            .enumerate()
            .map(|(i, id)| RankEntry {
                rank: i as u32 + 1,
                rank_level: 12,
                members: vec![Member::new(*id, format!("p-{id}"), "ru")],
                streak: 1,
                wins: 30,
                losses: 20,
                drops: 0,
                disputes: 0,
                last_match_date: 1_615_200_000,
            })
            .collect();
        RankSnapshot::from_entries(partition(), day, entries, 500).unwrap()
    }

    fn state_with_snapshots(temp_dir: &TempDir) -> (AppState, SnapshotDay, SnapshotDay) {
        let state = AppState::new(StorageConfig::new(temp_dir.path().to_path_buf()));
        // Days must sit inside the tracking window at test time; a week
        // back from "now" always does.
        let today = Utc::now().date_naive();
        let day = SnapshotDay::latest_allowed(today).pred();
        let historic = day.pred();

        state.store.write(&snapshot(day, &["a", "b"])).unwrap();
        state.store.write(&snapshot(historic, &["b", "a"])).unwrap();
        (state, day, historic)
    }

    fn params(day: SnapshotDay, historic: SnapshotDay) -> LeaderboardParams {
        LeaderboardParams {
            time_stamp: Some(day.timestamp().to_string()),
            historic_time_stamp: Some(historic.timestamp().to_string()),
            game_type: Some("1v1".to_string()),
            race: Some("soviet".to_string()),
            page: None,
            page_size: None,
        }
    }

    #[tokio::test]
    async fn test_leaderboard_merges_and_echoes_selection() {
        let temp_dir = TempDir::new().unwrap();
        let (state, day, historic) = state_with_snapshots(&temp_dir);

        let response = get_leaderboard(State(state), Query(params(day, historic)))
            .await
            .unwrap()
            .0;

        assert_eq!(response.rank_total, 500);
        assert_eq!(response.rows.len(), 2);
        // a and b swapped places between the two snapshots.
        assert_eq!(response.rows[0].change, RankChange::Moved(1));
        assert_eq!(response.rows[1].change, RankChange::Moved(-1));

        assert_eq!(response.selection.time_stamp, day.timestamp());
        assert_eq!(response.selection.game_type, GameType::OneVsOne);
        assert_eq!(response.selection.race, Faction::Soviet);
    }

    #[tokio::test]
    async fn test_leaderboard_missing_current_is_empty_not_error() {
        let temp_dir = TempDir::new().unwrap();
        let (state, day, _) = state_with_snapshots(&temp_dir);

        // A day with no stored snapshot at all.
        let empty_day = day.pred().pred();
        let response = get_leaderboard(State(state), Query(params(empty_day, day)))
            .await
            .unwrap()
            .0;

        assert_eq!(response.rank_total, 0);
        assert!(response.rows.is_empty());
        assert_eq!(response.pagination.total_items, 0);
    }

    #[tokio::test]
    async fn test_leaderboard_missing_historic_marks_new() {
        let temp_dir = TempDir::new().unwrap();
        let (state, day, _) = state_with_snapshots(&temp_dir);

        let empty_day = day.pred().pred();
        let response = get_leaderboard(State(state), Query(params(day, empty_day)))
            .await
            .unwrap()
            .0;

        assert_eq!(response.rows.len(), 2);
        assert!(response.rows.iter().all(|r| r.change == RankChange::New));
    }

    #[tokio::test]
    async fn test_leaderboard_pagination() {
        let temp_dir = TempDir::new().unwrap();
        let (state, day, historic) = state_with_snapshots(&temp_dir);

        let mut p = params(day, historic);
        p.page = Some(2);
        p.page_size = Some(1);

        let response = get_leaderboard(State(state), Query(p)).await.unwrap().0;
        assert_eq!(response.rows.len(), 1);
        assert_eq!(response.rows[0].entry.rank, 2);
        assert_eq!(response.pagination.total_pages, 2);
        assert!(response.pagination.has_prev);
        assert!(!response.pagination.has_next);
    }
}
