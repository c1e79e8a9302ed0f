//! Snapshot merge engine.
//!
//! Combines a current ranking snapshot with a historic one into the table
//! row model: every current entry, in rank order, annotated with its rank
//! movement since the historic capture. Pure and synchronous; tolerates
//! either input being absent, so it can be re-run for every combination of
//! two independently loading subscriptions.

use tracing::warn;

use crate::models::{MergedRow, RankChange, RankSnapshot};

/// Merge a current snapshot with a historic one into leaderboard rows.
///
/// - `current` absent: the table has nothing to show yet; returns an empty
///   sequence regardless of `historic`.
/// - `historic` absent: every row's change is [`RankChange::New`].
/// - A group found in both: `change = historic_rank - current_rank`, so a
///   positive value means the group climbed the ladder.
/// - A group only in `current` (e.g. it was below the historic capture's
///   rank cutoff): [`RankChange::New`].
///
/// Output order is `current`'s rank order; groups present only in
/// `historic` are dropped. Never panics on absent inputs.
pub fn merge_snapshots(
    current: Option<&RankSnapshot>,
    historic: Option<&RankSnapshot>,
) -> Vec<MergedRow> {
    let Some(current) = current else {
        return Vec::new();
    };

    if let Some(historic) = historic {
        if historic.partition() != current.partition() {
            // Caller bug: the two snapshots describe different ladders.
            warn!(
                current = %current.partition(),
                historic = %historic.partition(),
                "merging snapshots from different partitions"
            );
            debug_assert_eq!(historic.partition(), current.partition());
        }
    }

    current
        .entries()
        .iter()
        .map(|entry| {
            debug_assert!(!entry.members.is_empty(), "rank entry without members");
            let change = match historic.and_then(|h| h.rank_of(&entry.group_key())) {
                Some(then) => RankChange::Moved(i64::from(then) - i64::from(entry.rank)),
                None => RankChange::New,
            };
            MergedRow {
                entry: entry.clone(),
                change,
            }
        })
        .collect()
}
