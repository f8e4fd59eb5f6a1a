use std::sync::Arc;
use tracing::{info, instrument};

use super::calculator::calculate;
use super::models::{PercentageTable, PeriodStatus, PrizeArchiveEntry, PrizeAward};
use super::repository::PrizeArchiveRepository;
use crate::clock::Clock;
use crate::score::{Period, ScoreRepository};
use crate::shared::AppError;

#[derive(Debug, Clone)]
pub struct PrizeConfig {
    /// Total pool per period, in integer minor units.
    pub pool_minor: u64,
    pub table: PercentageTable,
}

impl Default for PrizeConfig {
    fn default() -> Self {
        Self {
            pool_minor: 1_000_000,
            table: PercentageTable::standard(),
        }
    }
}

/// One-way period finalization over a frozen snapshot of the ranked store.
///
/// Payouts are real money: once a period is completed, every further
/// finalize call returns the archived distribution unchanged instead of
/// recomputing against a moving snapshot.
pub struct PrizeDistributionService {
    scores: Arc<dyn ScoreRepository>,
    archive: Arc<dyn PrizeArchiveRepository>,
    clock: Arc<dyn Clock>,
    config: PrizeConfig,
}

impl PrizeDistributionService {
    pub fn new(
        scores: Arc<dyn ScoreRepository>,
        archive: Arc<dyn PrizeArchiveRepository>,
        clock: Arc<dyn Clock>,
        config: PrizeConfig,
    ) -> Self {
        Self {
            scores,
            archive,
            clock,
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn finalize(&self, period: &Period) -> Result<Vec<PrizeAward>, AppError> {
        if let Some(existing) = self.archive.get(period).await? {
            info!(%period, "Period already finalized, returning archived distribution");
            return Ok(existing.distribution);
        }

        let entry_count = self.scores.count_at_least(period, 0).await?;
        let snapshot: Vec<(String, u32)> = if entry_count == 0 {
            Vec::new()
        } else {
            self.scores
                .get_range(period, 1, entry_count as u32)
                .await?
                .into_iter()
                .map(|entry| (entry.user_id, entry.score))
                .collect()
        };

        let distribution = calculate(&snapshot, self.config.pool_minor, &self.config.table);
        let entry = PrizeArchiveEntry {
            distribution,
            finalized_at: self.clock.now(),
            status: PeriodStatus::Completed,
        };

        let canonical = self.archive.put_if_absent(period, entry).await?;
        info!(
            %period,
            awards = canonical.distribution.len(),
            "Period finalized"
        );
        Ok(canonical.distribution)
    }

    /// Periods without an archived distribution are still active.
    pub async fn status(&self, period: &Period) -> Result<PeriodStatus, AppError> {
        Ok(match self.archive.get(period).await? {
            Some(entry) => entry.status,
            None => PeriodStatus::Active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::prize::repository::InMemoryPrizeArchiveRepository;
    use crate::score::InMemoryScoreRepository;
    use chrono::{TimeZone, Utc};

    fn service() -> (PrizeDistributionService, Arc<InMemoryScoreRepository>) {
        let scores = Arc::new(InMemoryScoreRepository::new());
        let service = PrizeDistributionService::new(
            scores.clone(),
            Arc::new(InMemoryPrizeArchiveRepository::new()),
            Arc::new(ManualClock::starting_at(
                Utc.with_ymd_and_hms(2026, 8, 10, 0, 0, 0).unwrap(),
            )),
            PrizeConfig::default(),
        );
        (service, scores)
    }

    fn weekly() -> Period {
        Period::Weekly("2026-W32".to_string())
    }

    #[tokio::test]
    async fn finalize_twice_returns_identical_distributions() {
        let (service, scores) = service();
        for (user, score) in [("a", 30), ("b", 20), ("c", 10)] {
            scores.raise_if_greater(&weekly(), user, score).await.unwrap();
        }

        let first = service.finalize(&weekly()).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(service.status(&weekly()).await.unwrap(), PeriodStatus::Completed);

        // A score landing after finalization must not change the payout.
        scores.raise_if_greater(&weekly(), "d", 99).await.unwrap();

        let second = service.finalize(&weekly()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn concurrent_finalizes_converge() {
        let (service, scores) = service();
        scores.raise_if_greater(&weekly(), "a", 30).await.unwrap();
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(
                async move { service.finalize(&weekly()).await.unwrap() },
            ));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        for pair in results.windows(2) {
            assert_eq!(pair[0], pair[1]);
        }
    }

    #[tokio::test]
    async fn empty_period_finalizes_to_an_empty_distribution() {
        let (service, _) = service();

        let distribution = service.finalize(&weekly()).await.unwrap();
        assert!(distribution.is_empty());
        assert_eq!(service.status(&weekly()).await.unwrap(), PeriodStatus::Completed);
    }

    #[tokio::test]
    async fn untouched_period_is_active() {
        let (service, _) = service();
        assert_eq!(service.status(&weekly()).await.unwrap(), PeriodStatus::Active);
    }
}
