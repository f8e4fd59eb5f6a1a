use serde::Serialize;

use crate::score::Period;

/// A player the submitter just passed. Ephemeral: returned to the caller
/// and handed to the notification collaborator, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OvertakeEvent {
    pub overtaken_user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// The overtaken user's rank before the raise was applied.
    pub previous_rank: u32,
    /// The submitter's rank after the raise.
    pub new_rank: u32,
    pub period: Period,
}

/// Outcome of detect-and-raise for one period.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub is_new_best: bool,
    pub previous_rank: Option<u32>,
    pub new_rank: Option<u32>,
    pub overtakes: Vec<OvertakeEvent>,
}

impl SubmissionOutcome {
    pub fn no_improvement(rank: Option<u32>) -> Self {
        Self {
            success: true,
            is_new_best: false,
            previous_rank: rank,
            new_rank: rank,
            overtakes: Vec::new(),
        }
    }
}
