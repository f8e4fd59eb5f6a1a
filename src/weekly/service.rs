use std::sync::Arc;
use tracing::{debug, instrument};

use super::models::{is_guest, WeeklyStats};
use super::repository::WeeklyStatsRepository;
use crate::clock::Clock;
use crate::score::{Period, ScoreRepository};
use crate::shared::AppError;

/// Accumulates per-user weekly statistics and mirrors the cumulative score
/// into the ranked score store.
pub struct WeeklyScoreAggregator {
    repository: Arc<dyn WeeklyStatsRepository>,
    scores: Arc<dyn ScoreRepository>,
    clock: Arc<dyn Clock>,
}

impl WeeklyScoreAggregator {
    pub fn new(
        repository: Arc<dyn WeeklyStatsRepository>,
        scores: Arc<dyn ScoreRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            scores,
            clock,
        }
    }

    /// Records one qualifying run and returns the updated cumulative score,
    /// or `None` when the user is a guest (anonymous play is never
    /// competitive).
    #[instrument(skip(self))]
    pub async fn record_run(
        &self,
        user_id: &str,
        period: &Period,
        streak: u32,
    ) -> Result<Option<u32>, AppError> {
        if is_guest(user_id) {
            debug!(user_id, "Guest run not recorded");
            return Ok(None);
        }

        let stats = self
            .repository
            .record_run(period, user_id, streak, self.clock.now())
            .await?;
        self.scores
            .raise_if_greater(period, user_id, stats.cumulative_score)
            .await?;

        debug!(
            user_id,
            %period,
            cumulative_score = stats.cumulative_score,
            best_streak = stats.best_streak,
            run_count = stats.run_count,
            "Run recorded"
        );
        Ok(Some(stats.cumulative_score))
    }

    pub async fn get_stats(
        &self,
        period: &Period,
        user_id: &str,
    ) -> Result<Option<WeeklyStats>, AppError> {
        self.repository.get(period, user_id).await
    }

    /// Drops stats whose retention window has passed.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        self.repository.remove_expired(self.clock.now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::score::InMemoryScoreRepository;
    use crate::weekly::repository::InMemoryWeeklyStatsRepository;
    use chrono::{TimeZone, Utc};

    fn period() -> Period {
        Period::Weekly("2026-W32".to_string())
    }

    fn aggregator() -> (WeeklyScoreAggregator, Arc<InMemoryScoreRepository>) {
        let scores = Arc::new(InMemoryScoreRepository::new());
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2026, 8, 4, 12, 0, 0).unwrap(),
        ));
        let aggregator = WeeklyScoreAggregator::new(
            Arc::new(InMemoryWeeklyStatsRepository::new()),
            scores.clone(),
            clock,
        );
        (aggregator, scores)
    }

    #[tokio::test]
    async fn accumulates_streaks_across_runs() {
        let (aggregator, _) = aggregator();

        assert_eq!(
            aggregator.record_run("alice", &period(), 5).await.unwrap(),
            Some(5)
        );
        assert_eq!(
            aggregator.record_run("alice", &period(), 3).await.unwrap(),
            Some(8)
        );
        assert_eq!(
            aggregator.record_run("alice", &period(), 9).await.unwrap(),
            Some(17)
        );

        let stats = aggregator
            .get_stats(&period(), "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.cumulative_score, 17);
        assert_eq!(stats.best_streak, 9);
        assert_eq!(stats.run_count, 3);
    }

    #[tokio::test]
    async fn mirrors_cumulative_score_into_the_ranked_store() {
        let (aggregator, scores) = aggregator();

        aggregator.record_run("alice", &period(), 5).await.unwrap();
        aggregator.record_run("alice", &period(), 7).await.unwrap();

        assert_eq!(
            scores.get_score(&period(), "alice").await.unwrap(),
            Some(12)
        );
    }

    #[tokio::test]
    async fn guests_are_never_recorded_or_ranked() {
        let (aggregator, scores) = aggregator();

        assert_eq!(
            aggregator
                .record_run("guest-42", &period(), 15)
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            aggregator
                .record_run("anonymous", &period(), 15)
                .await
                .unwrap(),
            None
        );

        assert!(aggregator
            .get_stats(&period(), "guest-42")
            .await
            .unwrap()
            .is_none());
        assert_eq!(scores.get_score(&period(), "guest-42").await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_runs_do_not_drop_increments() {
        let (aggregator, _) = aggregator();
        let aggregator = Arc::new(aggregator);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let aggregator = Arc::clone(&aggregator);
            handles.push(tokio::spawn(async move {
                aggregator.record_run("alice", &period(), 2).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = aggregator
            .get_stats(&period(), "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.cumulative_score, 40);
        assert_eq!(stats.run_count, 20);
    }
}
