use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::types::{OvertakeEvent, SubmissionOutcome};
use crate::identity::IdentityService;
use crate::score::{Period, ScoreRepository};
use crate::shared::AppError;

#[derive(Debug, Clone)]
pub struct OvertakeConfig {
    /// Most overtake events surfaced per period, nearest to the new rank
    /// first.
    pub max_overtakes: usize,
    /// Candidate window below the new rank when the submitter had no prior
    /// entry in the period.
    pub first_appearance_window: u32,
}

impl Default for OvertakeConfig {
    fn default() -> Self {
        Self {
            max_overtakes: 10,
            first_appearance_window: 100,
        }
    }
}

/// Computes rank deltas from a score submission and resolves which
/// previously-higher-ranked users were just passed.
///
/// Reads happen before the raise within the same request; the rare
/// interleaving where another submission lands in between under-reports an
/// overtake, it never corrupts the stored score.
pub struct OvertakeDetector {
    scores: Arc<dyn ScoreRepository>,
    identity: Arc<IdentityService>,
    config: OvertakeConfig,
}

impl OvertakeDetector {
    pub fn new(
        scores: Arc<dyn ScoreRepository>,
        identity: Arc<IdentityService>,
        config: OvertakeConfig,
    ) -> Self {
        Self {
            scores,
            identity,
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn detect_and_apply(
        &self,
        period: &Period,
        user_id: &str,
        new_score: u32,
    ) -> Result<SubmissionOutcome, AppError> {
        let old_rank = self.scores.get_rank(period, user_id).await?;
        let current_score = self.scores.get_score(period, user_id).await?;

        if let Some(current) = current_score {
            if new_score <= current {
                debug!(%period, user_id, new_score, current, "Not a personal best, no mutation");
                return Ok(SubmissionOutcome::no_improvement(old_rank));
            }
        }

        let new_rank = self.scores.count_at_least(period, new_score).await? as u32 + 1;

        // Everyone ranked between the landing spot and the submitter's old
        // position is about to be pushed down one.
        let window_end = match old_rank {
            Some(old) => old.saturating_sub(1),
            None => new_rank + self.config.first_appearance_window - 1,
        };
        let candidates = if window_end >= new_rank {
            self.scores.get_range(period, new_rank, window_end).await?
        } else {
            Vec::new()
        };

        let raise = self
            .scores
            .raise_if_greater(period, user_id, new_score)
            .await?;
        if !raise.applied {
            // A concurrently-written higher score won the race. Drop the
            // computed overtakes: under-report, never over-report.
            warn!(%period, user_id, new_score, "Raise lost a concurrent race");
            let rank_now = self.scores.get_rank(period, user_id).await?;
            return Ok(SubmissionOutcome {
                success: true,
                is_new_best: false,
                previous_rank: old_rank,
                new_rank: rank_now,
                overtakes: Vec::new(),
            });
        }

        let overtaken: Vec<_> = candidates
            .into_iter()
            .filter(|entry| entry.user_id != user_id)
            .take(self.config.max_overtakes)
            .collect();

        let user_ids: Vec<String> = overtaken.iter().map(|e| e.user_id.clone()).collect();
        let identities = self.identity.resolve_many(&user_ids).await;

        // Users whose identity could not be resolved are dropped rather
        // than failing the whole call.
        let overtakes: Vec<OvertakeEvent> = overtaken
            .iter()
            .filter_map(|entry| {
                identities.get(&entry.user_id).map(|identity| OvertakeEvent {
                    overtaken_user_id: entry.user_id.clone(),
                    display_name: identity.display_name().to_string(),
                    avatar_url: identity.avatar_url().map(|s| s.to_string()),
                    previous_rank: entry.rank,
                    new_rank,
                    period: period.clone(),
                })
            })
            .collect();

        debug!(
            %period,
            user_id,
            ?old_rank,
            new_rank,
            overtaken = overtakes.len(),
            "Personal best applied"
        );

        Ok(SubmissionOutcome {
            success: true,
            is_new_best: true,
            previous_rank: old_rank,
            new_rank: Some(new_rank),
            overtakes,
        })
    }
}
