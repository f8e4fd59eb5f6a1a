use std::sync::Arc;
use tracing::{debug, instrument};

use super::repository::PositionRepository;
use super::types::{Direction, PositionChange};
use crate::score::{Period, ScoreRepository};
use crate::shared::AppError;

/// Reports rank movement across sessions, independent of live submission.
///
/// Each check advances the stored baseline to the freshly observed rank, so
/// a second check with no intervening score change always reports no
/// movement.
pub struct PositionChangeTracker {
    positions: Arc<dyn PositionRepository>,
    scores: Arc<dyn ScoreRepository>,
}

impl PositionChangeTracker {
    pub fn new(positions: Arc<dyn PositionRepository>, scores: Arc<dyn ScoreRepository>) -> Self {
        Self { positions, scores }
    }

    #[instrument(skip(self))]
    pub async fn check_position_change(
        &self,
        user_id: &str,
        board: &Period,
    ) -> Result<PositionChange, AppError> {
        let previous = self.positions.get_last_rank(board, user_id).await?;
        let current = self.scores.get_rank(board, user_id).await?;

        // The baseline only moves on observations with a live rank.
        if let Some(rank) = current {
            self.positions.set_last_rank(board, user_id, rank).await?;
        }

        let change = match (previous, current) {
            (Some(prev), Some(now)) if prev != now => PositionChange {
                changed: true,
                previous_rank: Some(prev),
                current_rank: Some(now),
                direction: if now < prev {
                    Direction::Up
                } else {
                    Direction::Down
                },
                rank_change: i64::from(prev) - i64::from(now),
            },
            _ => PositionChange::unchanged(previous, current),
        };

        debug!(
            user_id,
            %board,
            ?previous,
            ?current,
            changed = change.changed,
            "Position checked"
        );
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::repository::InMemoryPositionRepository;
    use crate::score::InMemoryScoreRepository;

    fn tracker() -> (PositionChangeTracker, Arc<InMemoryScoreRepository>) {
        let scores = Arc::new(InMemoryScoreRepository::new());
        let tracker =
            PositionChangeTracker::new(Arc::new(InMemoryPositionRepository::new()), scores.clone());
        (tracker, scores)
    }

    #[tokio::test]
    async fn first_observation_seeds_the_baseline_without_reporting_change() {
        let (tracker, scores) = tracker();
        scores
            .raise_if_greater(&Period::Global, "alice", 10)
            .await
            .unwrap();

        let change = tracker
            .check_position_change("alice", &Period::Global)
            .await
            .unwrap();

        assert!(!change.changed);
        assert_eq!(change.previous_rank, None);
        assert_eq!(change.current_rank, Some(1));
        assert_eq!(change.direction, Direction::Same);
    }

    #[tokio::test]
    async fn movement_is_reported_once_then_the_baseline_advances() {
        let (tracker, scores) = tracker();
        scores.raise_if_greater(&Period::Global, "alice", 10).await.unwrap();
        scores.raise_if_greater(&Period::Global, "bob", 20).await.unwrap();

        // Seed alice's baseline at rank 2.
        tracker
            .check_position_change("alice", &Period::Global)
            .await
            .unwrap();

        scores.raise_if_greater(&Period::Global, "alice", 30).await.unwrap();

        let first = tracker
            .check_position_change("alice", &Period::Global)
            .await
            .unwrap();
        assert!(first.changed);
        assert_eq!(first.previous_rank, Some(2));
        assert_eq!(first.current_rank, Some(1));
        assert_eq!(first.direction, Direction::Up);
        assert_eq!(first.rank_change, 1);

        // No intervening score change: the first call advanced the baseline.
        let second = tracker
            .check_position_change("alice", &Period::Global)
            .await
            .unwrap();
        assert!(!second.changed);
        assert_eq!(second.previous_rank, Some(1));
        assert_eq!(second.current_rank, Some(1));
    }

    #[tokio::test]
    async fn dropping_down_the_board_reports_negative_rank_change() {
        let (tracker, scores) = tracker();
        scores.raise_if_greater(&Period::Global, "alice", 30).await.unwrap();
        tracker
            .check_position_change("alice", &Period::Global)
            .await
            .unwrap();

        scores.raise_if_greater(&Period::Global, "bob", 40).await.unwrap();
        scores.raise_if_greater(&Period::Global, "carol", 50).await.unwrap();

        let change = tracker
            .check_position_change("alice", &Period::Global)
            .await
            .unwrap();
        assert!(change.changed);
        assert_eq!(change.previous_rank, Some(1));
        assert_eq!(change.current_rank, Some(3));
        assert_eq!(change.direction, Direction::Down);
        assert_eq!(change.rank_change, -2);
    }

    #[tokio::test]
    async fn user_with_no_entry_reports_no_change() {
        let (tracker, _) = tracker();

        let change = tracker
            .check_position_change("nobody", &Period::Global)
            .await
            .unwrap();

        assert!(!change.changed);
        assert_eq!(change.previous_rank, None);
        assert_eq!(change.current_rank, None);
    }
}
