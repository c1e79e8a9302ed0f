//! Day-granular snapshot timestamps.
//!
//! Snapshots are captured once per day; they are addressed by the Unix
//! timestamp of that day's UTC midnight, matching the query-string format
//! the leaderboard pages use.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Day parsing errors.
#[derive(Debug, Error)]
pub enum DayError {
    #[error("invalid day (expected a unix timestamp or YYYY-MM-DD): {0}")]
    Invalid(String),
}

/// A day-granular Unix timestamp (seconds at UTC midnight).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SnapshotDay(i64);

impl SnapshotDay {
    /// Create from any Unix timestamp, flooring to the containing UTC day.
    pub fn from_timestamp(ts: i64) -> Self {
        Self(ts - ts.rem_euclid(SECONDS_PER_DAY))
    }

    /// Create from a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap();
        Self(midnight.and_utc().timestamp())
    }

    /// First day snapshots were captured for.
    pub fn tracking_start() -> Self {
        Self::from_date(NaiveDate::from_ymd_opt(2021, 3, 8).unwrap())
    }

    /// The most recent selectable day: yesterday, since today's snapshot
    /// may not have been captured yet.
    pub fn latest_allowed(today: NaiveDate) -> Self {
        let yesterday = today.pred_opt().unwrap_or(today);
        Self::from_date(yesterday)
    }

    /// The day timestamp, in seconds.
    pub fn timestamp(&self) -> i64 {
        self.0
    }

    /// The calendar date of this day.
    pub fn date(&self) -> NaiveDate {
        DateTime::from_timestamp(self.0, 0)
            .map(|dt| dt.date_naive())
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
    }

    /// The previous day.
    pub fn pred(&self) -> Self {
        Self(self.0 - SECONDS_PER_DAY)
    }

    /// The next day.
    pub fn succ(&self) -> Self {
        Self(self.0 + SECONDS_PER_DAY)
    }

    /// Whether this day falls inside the selectable tracking window.
    pub fn is_trackable(&self, today: NaiveDate) -> bool {
        *self >= Self::tracking_start() && *self <= Self::latest_allowed(today)
    }

    /// Clamp this day into the selectable tracking window.
    pub fn clamp_to_window(self, today: NaiveDate) -> Self {
        let start = Self::tracking_start();
        let end = Self::latest_allowed(today);
        if self < start {
            start
        } else if self > end {
            end
        } else {
            self
        }
    }
}

impl fmt::Display for SnapshotDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnapshotDay {
    type Err = DayError;

    /// Parse either the raw day-timestamp form ("1615161600") or an ISO
    /// date ("2021-03-08").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(ts) = s.parse::<i64>() {
            return Ok(Self::from_timestamp(ts));
        }
        if let Ok(date) = s.parse::<NaiveDate>() {
            return Ok(Self::from_date(date));
        }
        Err(DayError::Invalid(s.to_string()))
    }
}
