use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Which way the user moved on the board since last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Same,
}

/// Movement report for one (board, user) pair.
#[derive(Debug, Clone, Serialize)]
pub struct PositionChange {
    pub changed: bool,
    pub previous_rank: Option<u32>,
    pub current_rank: Option<u32>,
    pub direction: Direction,
    /// Positive when the user moved up the board (numerically smaller rank).
    pub rank_change: i64,
}

impl PositionChange {
    pub fn unchanged(previous_rank: Option<u32>, current_rank: Option<u32>) -> Self {
        Self {
            changed: false,
            previous_rank,
            current_rank,
            direction: Direction::Same,
            rank_change: 0,
        }
    }
}
