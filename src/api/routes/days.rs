use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::SnapshotDay;

#[derive(Debug, Serialize)]
pub struct DaysResponse {
    /// First day snapshots exist for; the date pickers disable anything earlier.
    pub tracking_start: i64,

    /// Latest selectable day (yesterday).
    pub latest_allowed: i64,

    /// Days actually present in the local store, ascending.
    pub days: Vec<i64>,
}

pub async fn list_days(State(state): State<AppState>) -> Result<Json<DaysResponse>, ApiError> {
    let days = state
        .store
        .list_days()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let today = Utc::now().date_naive();
    Ok(Json(DaysResponse {
        tracking_start: SnapshotDay::tracking_start().timestamp(),
        latest_allowed: SnapshotDay::latest_allowed(today).timestamp(),
        days: days.iter().map(|d| d.timestamp()).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Faction, GameType, LadderPartition, Member, RankEntry, RankSnapshot,
    };
    use crate::storage::StorageConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_days_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState::new(StorageConfig::new(temp_dir.path().to_path_buf()));

        let response = list_days(State(state)).await.unwrap().0;
        assert!(response.days.is_empty());
        assert_eq!(
            response.tracking_start,
            SnapshotDay::tracking_start().timestamp()
        );
        assert!(response.latest_allowed > response.tracking_start);
    }

    #[tokio::test]
    async fn test_days_lists_stored_days() {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState::new(StorageConfig::new(temp_dir.path().to_path_buf()));

        let partition = LadderPartition::new(GameType::OneVsOne, Faction::Usf).unwrap();
        let day = SnapshotDay::from_timestamp(1_615_161_600);
        let entries = vec![RankEntry {
            rank: 1,
            rank_level: 5,
            members: vec![Member::new("9", "pathfinder", "us")],
            streak: 1,
            wins: 3,
            losses: 1,
            drops: 0,
            disputes: 0,
            last_match_date: 1_615_200_000,
        }];
        let snapshot = RankSnapshot::from_entries(partition, day, entries, 30).unwrap();
        state.store.write(&snapshot).unwrap();

        let response = list_days(State(state)).await.unwrap().0;
        assert_eq!(response.days, vec![1_615_161_600]);
    }
}
