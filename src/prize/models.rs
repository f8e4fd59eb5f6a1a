use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// One payout line of a finalized distribution. `amount` is in integer
/// minor units of the pool currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeAward {
    pub rank: u32,
    pub user_id: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PeriodStatus {
    Active,
    Completed,
}

/// Write-once archive record of a finalized period. Once `completed`, an
/// immutable historical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeArchiveEntry {
    pub distribution: Vec<PrizeAward>,
    pub finalized_at: DateTime<Utc>,
    pub status: PeriodStatus,
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("table shares sum to {0} basis points, more than the whole pool")]
    SumExceedsWhole(u32),
    #[error("share for rank {0} exceeds the share of a better rank")]
    NotMonotonic(u32),
    #[error("duplicate share for rank {0}")]
    DuplicateRank(u32),
}

/// Payout shares by rank, in basis points of the total pool.
///
/// Shares must be unique per rank, non-increasing as rank worsens, and sum
/// to at most the whole pool.
#[derive(Debug, Clone)]
pub struct PercentageTable {
    shares: Vec<(u32, u32)>,
}

impl PercentageTable {
    pub fn new(mut shares: Vec<(u32, u32)>) -> Result<Self, TableError> {
        shares.sort_by_key(|(rank, _)| *rank);

        let mut sum: u32 = 0;
        let mut previous: Option<(u32, u32)> = None;
        for (rank, bps) in &shares {
            if let Some((prev_rank, prev_bps)) = previous {
                if prev_rank == *rank {
                    return Err(TableError::DuplicateRank(*rank));
                }
                if *bps > prev_bps {
                    return Err(TableError::NotMonotonic(*rank));
                }
            }
            sum += bps;
            previous = Some((*rank, *bps));
        }
        if sum > 10_000 {
            return Err(TableError::SumExceedsWhole(sum));
        }

        Ok(Self { shares })
    }

    /// The stock table: ranks 1..=25, whole pool distributed.
    pub fn standard() -> Self {
        let mut shares = vec![
            (1, 2_500),
            (2, 1_500),
            (3, 1_000),
            (4, 800),
            (5, 600),
            (6, 500),
            (7, 400),
            (8, 350),
            (9, 300),
            (10, 250),
        ];
        shares.extend((11..=25).map(|rank| (rank, 120)));
        Self::new(shares).expect("stock table is valid")
    }

    pub fn basis_points(&self, rank: u32) -> Option<u32> {
        self.shares
            .iter()
            .find(|(r, _)| *r == rank)
            .map(|(_, bps)| *bps)
    }

    pub fn covered_ranks(&self) -> impl Iterator<Item = u32> + '_ {
        self.shares.iter().map(|(rank, _)| *rank)
    }
}
