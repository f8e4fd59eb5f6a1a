use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument};

use super::models::WeeklyStats;
use crate::score::Period;
use crate::shared::AppError;

#[async_trait]
pub trait WeeklyStatsRepository: Send + Sync {
    async fn get(&self, period: &Period, user_id: &str) -> Result<Option<WeeklyStats>, AppError>;

    /// Applies one run to the user's stats as a single atomic accumulation:
    /// load-or-init, add the streak to the cumulative score, raise the best
    /// streak, bump the run count. Returns the updated stats.
    async fn record_run(
        &self,
        period: &Period,
        user_id: &str,
        streak: u32,
        now: DateTime<Utc>,
    ) -> Result<WeeklyStats, AppError>;

    /// Drops entries whose retention window has passed. Returns how many
    /// were removed.
    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

/// In-memory implementation for development and testing.
///
/// The accumulation happens inside the repository lock, so concurrent runs
/// for the same user can never drop an increment.
pub struct InMemoryWeeklyStatsRepository {
    entries: Mutex<HashMap<(String, String), WeeklyStats>>,
}

impl Default for InMemoryWeeklyStatsRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWeeklyStatsRepository {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl WeeklyStatsRepository for InMemoryWeeklyStatsRepository {
    async fn get(&self, period: &Period, user_id: &str) -> Result<Option<WeeklyStats>, AppError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(&(period.to_string(), user_id.to_string()))
            .cloned())
    }

    async fn record_run(
        &self,
        period: &Period,
        user_id: &str,
        streak: u32,
        now: DateTime<Utc>,
    ) -> Result<WeeklyStats, AppError> {
        let mut entries = self.entries.lock().unwrap();
        let stats = entries
            .entry((period.to_string(), user_id.to_string()))
            .or_insert_with(|| WeeklyStats::new(period.clone(), user_id, now));

        stats.cumulative_score += streak;
        stats.best_streak = stats.best_streak.max(streak);
        stats.run_count += 1;
        stats.last_updated = now;

        Ok(stats.clone())
    }

    #[instrument(skip(self))]
    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut entries = self.entries.lock().unwrap();
        let initial = entries.len();
        entries.retain(|_, stats| match stats.expires_at() {
            Some(expires_at) => expires_at > now,
            None => true,
        });
        let removed = (initial - entries.len()) as u64;
        debug!(removed, "Expired weekly stats cleaned up");
        Ok(removed)
    }
}
