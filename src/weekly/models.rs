use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::score::Period;

/// Days a weekly window's stats are kept after the window starts: the 7-day
/// window itself plus one day of audit grace for finalization.
pub const WEEKLY_RETENTION_DAYS: i64 = 8;

/// Per-user cumulative statistics within one scoring period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub period: Period,
    pub user_id: String,
    /// Sum of the streak achieved on every qualifying run in the period.
    /// This is the canonical weekly ranking metric.
    pub cumulative_score: u32,
    pub best_streak: u32,
    pub run_count: u32,
    pub last_updated: DateTime<Utc>,
}

impl WeeklyStats {
    pub fn new(period: Period, user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            period,
            user_id: user_id.to_string(),
            cumulative_score: 0,
            best_streak: 0,
            run_count: 0,
            last_updated: now,
        }
    }

    /// Alternate display-only metric. Never wired into ranking.
    pub fn engagement_score(&self) -> u32 {
        self.best_streak * 10 + self.run_count
    }

    /// When this entry leaves the store. Entries of the global period never
    /// expire.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.period
            .window_start()
            .map(|start| start + Duration::days(WEEKLY_RETENTION_DAYS))
    }
}

/// Anonymous play is allowed but never competitive: guest users are not
/// recorded and not ranked.
pub fn is_guest(user_id: &str) -> bool {
    user_id.starts_with("guest-") || user_id == "anonymous"
}
