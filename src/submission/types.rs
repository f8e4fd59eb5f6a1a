use serde::{Deserialize, Serialize};

use crate::overtake::OvertakeEvent;
use crate::replay::ReplayVerdict;
use crate::score::Period;

/// What the caller gets back for a submitted run. Dependency failures are
/// absorbed into `accepted: false` with a reason; nothing on this path may
/// abort the caller's game-completion flow.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub accepted: bool,
    pub rejection_reason: Option<String>,
    pub failed_at_round: Option<u32>,
    pub new_rank: Option<u32>,
    pub overtakes: Vec<OvertakeEvent>,
}

impl SubmissionResult {
    pub fn accepted(new_rank: Option<u32>, overtakes: Vec<OvertakeEvent>) -> Self {
        Self {
            accepted: true,
            rejection_reason: None,
            failed_at_round: None,
            new_rank,
            overtakes,
        }
    }

    /// Guest runs are accepted but never ranked.
    pub fn accepted_uncompetitive() -> Self {
        Self::accepted(None, Vec::new())
    }

    pub fn rejected(verdict: ReplayVerdict) -> Self {
        Self {
            accepted: false,
            rejection_reason: verdict.reason,
            failed_at_round: verdict.failed_at_round,
            new_rank: None,
            overtakes: Vec::new(),
        }
    }

    /// Soft failure while the storage backend is unreachable.
    pub fn unavailable() -> Self {
        Self {
            accepted: false,
            rejection_reason: Some("leaderboard temporarily unavailable".to_string()),
            failed_at_round: None,
            new_rank: None,
            overtakes: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(default = "default_start")]
    pub start: u32,
    #[serde(default = "default_end")]
    pub end: u32,
}

fn default_start() -> u32 {
    1
}

fn default_end() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize)]
pub struct StandingResponse {
    pub rank: u32,
    pub score: u32,
}

#[derive(Debug, Deserialize)]
pub struct PositionCheckRequest {
    pub user_id: String,
    pub board: Period,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}
