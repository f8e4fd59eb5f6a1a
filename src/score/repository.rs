use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{Period, RaiseOutcome, RankedEntry};
use crate::shared::AppError;

/// Ordered per-period score store.
///
/// `raise_if_greater` is the load-bearing contract of the engine: it must be
/// one atomic operation at the storage layer, never a client-side
/// read-then-write. Every other guarantee (rank totality, overtake accuracy,
/// prize fairness) assumes it holds under concurrent submissions.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Sets the entry's score to `score` only if it is strictly greater than
    /// the concurrently-visible current value.
    async fn raise_if_greater(
        &self,
        period: &Period,
        user_id: &str,
        score: u32,
    ) -> Result<RaiseOutcome, AppError>;

    async fn get_score(&self, period: &Period, user_id: &str) -> Result<Option<u32>, AppError>;

    /// 1-indexed rank by descending score, ties broken by user_id ascending.
    async fn get_rank(&self, period: &Period, user_id: &str) -> Result<Option<u32>, AppError>;

    /// Entries at ranks `start_rank..=end_rank` (1-indexed, inclusive).
    async fn get_range(
        &self,
        period: &Period,
        start_rank: u32,
        end_rank: u32,
    ) -> Result<Vec<RankedEntry>, AppError>;

    /// Number of entries with score >= the given value.
    async fn count_at_least(&self, period: &Period, score: u32) -> Result<u64, AppError>;

    /// Drops all entries of one period without touching any other period.
    async fn clear_period(&self, period: &Period) -> Result<(), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

#[derive(Default)]
struct PeriodBoard {
    by_user: HashMap<String, u32>,
    // Reverse(score) ascending == score descending, then user_id ascending:
    // iteration order is exactly rank order.
    ordered: BTreeSet<(Reverse<u32>, String)>,
}

/// In-memory implementation for development and testing.
///
/// Every raise runs inside one mutex-guarded critical section, which gives
/// the same atomicity the Postgres implementation gets from its transaction.
pub struct InMemoryScoreRepository {
    boards: Mutex<HashMap<String, PeriodBoard>>,
}

impl Default for InMemoryScoreRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryScoreRepository {
    pub fn new() -> Self {
        Self {
            boards: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ScoreRepository for InMemoryScoreRepository {
    #[instrument(skip(self))]
    async fn raise_if_greater(
        &self,
        period: &Period,
        user_id: &str,
        score: u32,
    ) -> Result<RaiseOutcome, AppError> {
        let mut boards = self.boards.lock().unwrap();
        let board = boards.entry(period.to_string()).or_default();

        match board.by_user.get(user_id).copied() {
            Some(previous) if score <= previous => {
                debug!(%period, user_id, score, previous, "Raise skipped, not an improvement");
                Ok(RaiseOutcome {
                    applied: false,
                    previous_score: Some(previous),
                })
            }
            previous => {
                if let Some(prev) = previous {
                    board.ordered.remove(&(Reverse(prev), user_id.to_string()));
                }
                board.by_user.insert(user_id.to_string(), score);
                board.ordered.insert((Reverse(score), user_id.to_string()));
                debug!(%period, user_id, score, ?previous, "Score raised");
                Ok(RaiseOutcome {
                    applied: true,
                    previous_score: previous,
                })
            }
        }
    }

    async fn get_score(&self, period: &Period, user_id: &str) -> Result<Option<u32>, AppError> {
        let boards = self.boards.lock().unwrap();
        Ok(boards
            .get(&period.to_string())
            .and_then(|board| board.by_user.get(user_id).copied()))
    }

    async fn get_rank(&self, period: &Period, user_id: &str) -> Result<Option<u32>, AppError> {
        let boards = self.boards.lock().unwrap();
        let Some(board) = boards.get(&period.to_string()) else {
            return Ok(None);
        };
        let Some(score) = board.by_user.get(user_id).copied() else {
            return Ok(None);
        };
        let key = (Reverse(score), user_id.to_string());
        let position = board.ordered.iter().position(|entry| *entry == key);
        Ok(position.map(|p| p as u32 + 1))
    }

    async fn get_range(
        &self,
        period: &Period,
        start_rank: u32,
        end_rank: u32,
    ) -> Result<Vec<RankedEntry>, AppError> {
        if start_rank == 0 || end_rank < start_rank {
            return Ok(Vec::new());
        }
        let boards = self.boards.lock().unwrap();
        let Some(board) = boards.get(&period.to_string()) else {
            return Ok(Vec::new());
        };
        let entries = board
            .ordered
            .iter()
            .enumerate()
            .skip(start_rank as usize - 1)
            .take((end_rank - start_rank + 1) as usize)
            .map(|(index, (Reverse(score), user_id))| RankedEntry {
                rank: index as u32 + 1,
                user_id: user_id.clone(),
                score: *score,
            })
            .collect();
        Ok(entries)
    }

    async fn count_at_least(&self, period: &Period, score: u32) -> Result<u64, AppError> {
        let boards = self.boards.lock().unwrap();
        let Some(board) = boards.get(&period.to_string()) else {
            return Ok(0);
        };
        let count = board
            .ordered
            .iter()
            .take_while(|(Reverse(s), _)| *s >= score)
            .count();
        Ok(count as u64)
    }

    #[instrument(skip(self))]
    async fn clear_period(&self, period: &Period) -> Result<(), AppError> {
        let mut boards = self.boards.lock().unwrap();
        boards.remove(&period.to_string());
        debug!(%period, "Period cleared");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// PostgreSQL implementation of the score store.
///
/// Expects the table:
///
/// ```sql
/// CREATE TABLE period_scores (
///     period  TEXT   NOT NULL,
///     user_id TEXT   NOT NULL,
///     score   BIGINT NOT NULL,
///     PRIMARY KEY (period, user_id)
/// );
/// ```
pub struct PostgresScoreRepository {
    pool: PgPool,
}

impl PostgresScoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreRepository for PostgresScoreRepository {
    #[instrument(skip(self))]
    async fn raise_if_greater(
        &self,
        period: &Period,
        user_id: &str,
        score: u32,
    ) -> Result<RaiseOutcome, AppError> {
        // One transaction: the row lock taken by FOR UPDATE makes the
        // compare and the conditional write a single atomic unit.
        let mut tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to open raise transaction");
            AppError::StoreUnavailable(e.to_string())
        })?;

        let existing: Option<i64> = sqlx::query(
            "SELECT score FROM period_scores WHERE period = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(period.to_string())
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, %period, user_id, "Failed to read score for raise");
            AppError::StoreUnavailable(e.to_string())
        })?
        .map(|row| row.get("score"));

        match existing {
            Some(previous) if i64::from(score) <= previous => {
                // Dropping the transaction rolls it back; nothing was written.
                Ok(RaiseOutcome {
                    applied: false,
                    previous_score: Some(previous as u32),
                })
            }
            previous => {
                sqlx::query(
                    "INSERT INTO period_scores (period, user_id, score) VALUES ($1, $2, $3) \
                     ON CONFLICT (period, user_id) DO UPDATE SET score = EXCLUDED.score",
                )
                .bind(period.to_string())
                .bind(user_id)
                .bind(i64::from(score))
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    warn!(error = %e, %period, user_id, "Failed to write raised score");
                    AppError::StoreUnavailable(e.to_string())
                })?;

                tx.commit().await.map_err(|e| {
                    warn!(error = %e, "Failed to commit raise transaction");
                    AppError::StoreUnavailable(e.to_string())
                })?;

                debug!(%period, user_id, score, "Score raised in database");
                Ok(RaiseOutcome {
                    applied: true,
                    previous_score: previous.map(|p| p as u32),
                })
            }
        }
    }

    async fn get_score(&self, period: &Period, user_id: &str) -> Result<Option<u32>, AppError> {
        let score: Option<i64> = sqlx::query_scalar(
            "SELECT score FROM period_scores WHERE period = $1 AND user_id = $2",
        )
        .bind(period.to_string())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, %period, user_id, "Failed to fetch score");
            AppError::StoreUnavailable(e.to_string())
        })?;
        Ok(score.map(|s| s as u32))
    }

    async fn get_rank(&self, period: &Period, user_id: &str) -> Result<Option<u32>, AppError> {
        let Some(score) = self.get_score(period, user_id).await? else {
            return Ok(None);
        };

        let ahead: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM period_scores \
             WHERE period = $1 AND (score > $2 OR (score = $2 AND user_id < $3))",
        )
        .bind(period.to_string())
        .bind(i64::from(score))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, %period, user_id, "Failed to compute rank");
            AppError::StoreUnavailable(e.to_string())
        })?;

        Ok(Some(ahead as u32 + 1))
    }

    async fn get_range(
        &self,
        period: &Period,
        start_rank: u32,
        end_rank: u32,
    ) -> Result<Vec<RankedEntry>, AppError> {
        if start_rank == 0 || end_rank < start_rank {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT user_id, score FROM period_scores WHERE period = $1 \
             ORDER BY score DESC, user_id ASC OFFSET $2 LIMIT $3",
        )
        .bind(period.to_string())
        .bind(i64::from(start_rank) - 1)
        .bind(i64::from(end_rank - start_rank + 1))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, %period, "Failed to fetch ranked range");
            AppError::StoreUnavailable(e.to_string())
        })?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| RankedEntry {
                rank: start_rank + index as u32,
                user_id: row.get("user_id"),
                score: row.get::<i64, _>("score") as u32,
            })
            .collect())
    }

    async fn count_at_least(&self, period: &Period, score: u32) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM period_scores WHERE period = $1 AND score >= $2",
        )
        .bind(period.to_string())
        .bind(i64::from(score))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, %period, "Failed to count scores");
            AppError::StoreUnavailable(e.to_string())
        })?;
        Ok(count as u64)
    }

    #[instrument(skip(self))]
    async fn clear_period(&self, period: &Period) -> Result<(), AppError> {
        sqlx::query("DELETE FROM period_scores WHERE period = $1")
            .bind(period.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, %period, "Failed to clear period");
                AppError::StoreUnavailable(e.to_string())
            })?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }
}
