use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::types::{StandingResponse, SubmissionResult};
use crate::clock::Clock;
use crate::identity::IdentityService;
use crate::notify::{NotificationKind, NotificationTrigger};
use crate::overtake::{OvertakeDetector, OvertakeEvent};
use crate::replay::{ReplayValidator, RunRecord, TokenPoolProvider};
use crate::score::{Period, RankedEntry, ScoreRepository};
use crate::shared::{AppError, AppState};
use crate::weekly::{is_guest, WeeklyScoreAggregator};

/// The engine facade: validates a completed run, updates every affected
/// scoring period, and reports what changed.
pub struct SubmissionService {
    scores: Arc<dyn ScoreRepository>,
    aggregator: WeeklyScoreAggregator,
    detector: OvertakeDetector,
    validator: ReplayValidator,
    token_pool: Arc<dyn TokenPoolProvider>,
    notifier: Arc<dyn NotificationTrigger>,
    identity: Arc<IdentityService>,
    clock: Arc<dyn Clock>,
}

impl SubmissionService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            scores: Arc::clone(&state.score_repository),
            aggregator: WeeklyScoreAggregator::new(
                Arc::clone(&state.weekly_repository),
                Arc::clone(&state.score_repository),
                Arc::clone(&state.clock),
            ),
            detector: OvertakeDetector::new(
                Arc::clone(&state.score_repository),
                Arc::clone(&state.identity),
                state.config.overtake.clone(),
            ),
            validator: ReplayValidator::new(
                Arc::clone(&state.timer_rules),
                state.config.validator.clone(),
            ),
            token_pool: Arc::clone(&state.token_pool),
            notifier: Arc::clone(&state.notifier),
            identity: Arc::clone(&state.identity),
            clock: Arc::clone(&state.clock),
        }
    }

    /// Accepts or rejects a completed run. Never returns an error: storage
    /// outages degrade to a soft failure so gameplay is never blocked by
    /// the leaderboard.
    #[instrument(skip(self, run), fields(run_id = %run.run_id, user_id = %run.user_id, claimed_streak = run.claimed_streak))]
    pub async fn submit_run(&self, run: RunRecord) -> SubmissionResult {
        match self.submit_run_inner(run).await {
            Ok(result) => result,
            Err(error) => {
                warn!(%error, "Submission degraded to soft failure");
                SubmissionResult::unavailable()
            }
        }
    }

    async fn submit_run_inner(&self, run: RunRecord) -> Result<SubmissionResult, AppError> {
        if is_guest(&run.user_id) {
            debug!(user_id = %run.user_id, "Guest run accepted without ranking");
            return Ok(SubmissionResult::accepted_uncompetitive());
        }

        if self.validator.requires_validation(run.claimed_streak) {
            let snapshot = self.token_pool.snapshot().await?;
            let verdict = self.validator.validate(&run, &snapshot);
            if !verdict.valid {
                info!(
                    user_id = %run.user_id,
                    failed_at_round = ?verdict.failed_at_round,
                    reason = ?verdict.reason,
                    "Run rejected by replay validation"
                );
                return Ok(SubmissionResult::rejected(verdict));
            }
        }

        let weekly_period = Period::weekly_for(self.clock.now());

        let global = self
            .detector
            .detect_and_apply(&Period::Global, &run.user_id, run.claimed_streak)
            .await?;

        // Weekly detection must read the board before the aggregator
        // mirrors the new cumulative into it, so the overtaken set is
        // computed against pre-submission state.
        let cumulative_before = self
            .aggregator
            .get_stats(&weekly_period, &run.user_id)
            .await?
            .map(|stats| stats.cumulative_score)
            .unwrap_or(0);
        let weekly = self
            .detector
            .detect_and_apply(
                &weekly_period,
                &run.user_id,
                cumulative_before + run.claimed_streak,
            )
            .await?;

        let cumulative = self
            .aggregator
            .record_run(&run.user_id, &weekly_period, run.claimed_streak)
            .await?;

        // One surfaced event per overtaken user across periods; the global
        // board wins the duplicate.
        let mut seen = HashSet::new();
        let mut overtakes: Vec<OvertakeEvent> = Vec::new();
        for event in global.overtakes.iter().chain(weekly.overtakes.iter()) {
            if seen.insert(event.overtaken_user_id.clone()) {
                overtakes.push(event.clone());
            }
        }

        self.dispatch_notifications(&run.user_id, &overtakes).await;

        info!(
            user_id = %run.user_id,
            new_rank = ?global.new_rank,
            is_new_best = global.is_new_best,
            weekly_cumulative = ?cumulative,
            overtakes = overtakes.len(),
            "Run accepted"
        );
        Ok(SubmissionResult::accepted(global.new_rank, overtakes))
    }

    /// Fire-and-forget: delivery failures never reach engine state.
    async fn dispatch_notifications(&self, submitter: &str, overtakes: &[OvertakeEvent]) {
        if overtakes.is_empty() {
            return;
        }
        let submitter_identity = self.identity.resolve_or_fallback(submitter).await;
        for event in overtakes {
            let payload = json!({
                "by": submitter_identity.display_name(),
                "new_rank": event.new_rank,
                "previous_rank": event.previous_rank,
                "period": event.period.to_string(),
            });
            self.notifier
                .notify(&event.overtaken_user_id, NotificationKind::Overtaken, payload)
                .await;
        }
    }

    pub async fn get_leaderboard(
        &self,
        period: &Period,
        start_rank: u32,
        end_rank: u32,
    ) -> Result<Vec<RankedEntry>, AppError> {
        self.scores.get_range(period, start_rank, end_rank).await
    }

    /// `None` is the normal outcome for a user with no entry in the period.
    pub async fn get_user_standing(
        &self,
        period: &Period,
        user_id: &str,
    ) -> Result<Option<StandingResponse>, AppError> {
        let Some(rank) = self.scores.get_rank(period, user_id).await? else {
            return Ok(None);
        };
        let Some(score) = self.scores.get_score(period, user_id).await? else {
            return Ok(None);
        };
        Ok(Some(StandingResponse { rank, score }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{Guess, GuessRecord, TokenSequencer, TokenSnapshot};
    use crate::shared::test_utils::{test_token_snapshot, AppStateBuilder, RecordingNotifier};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn run_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 4, 11, 0, 0).unwrap()
    }

    /// Plays the seeded sequence faithfully for the given number of rounds.
    fn faithful_run(user_id: &str, seed: &str, rounds: usize) -> RunRecord {
        build_run(user_id, seed, rounds, &test_token_snapshot())
    }

    fn build_run(user_id: &str, seed: &str, rounds: usize, snapshot: &TokenSnapshot) -> RunRecord {
        let mut sequencer = TokenSequencer::new(seed, snapshot).unwrap();
        let started_at = run_start();

        let mut guesses = Vec::new();
        for index in 0..rounds {
            let (current, next) = sequencer.pair();
            let current_cap = snapshot.market_cap(current).unwrap();
            let next_cap = snapshot.market_cap(next).unwrap();

            let winning = if next_cap >= current_cap {
                Guess::Higher
            } else {
                Guess::Lower
            };

            guesses.push(GuessRecord {
                round_number: index as u32 + 1,
                current_token_id: current.to_string(),
                next_token_id: next.to_string(),
                guess: if index == rounds - 1 {
                    winning.opposite()
                } else {
                    winning
                },
                timestamp: started_at + Duration::seconds(2 * (index as i64 + 1)),
            });

            if index < rounds - 1 {
                sequencer.advance();
            }
        }

        RunRecord {
            run_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            seed: seed.to_string(),
            started_at,
            claimed_streak: rounds as u32 - 1,
            reprieves_used: 0,
            guesses,
        }
    }

    #[tokio::test]
    async fn sub_threshold_run_is_accepted_without_replay() {
        let state = AppStateBuilder::new().build();
        let service = SubmissionService::from_state(&state);

        // Claimed streak 8, below the threshold of 10: the bogus guess log
        // is never inspected.
        let mut run = faithful_run("alice", "any-seed", 9);
        run.guesses.clear();

        let result = service.submit_run(run).await;
        assert!(result.accepted);
        assert_eq!(result.new_rank, Some(1));
    }

    #[tokio::test]
    async fn tampered_run_above_threshold_is_rejected() {
        let state = AppStateBuilder::new().build();
        let service = SubmissionService::from_state(&state);

        let mut run = faithful_run("alice", "seed-x", 13);
        run.guesses.remove(5);
        for (index, guess) in run.guesses.iter_mut().enumerate() {
            guess.round_number = index as u32 + 1;
        }

        let result = service.submit_run(run).await;
        assert!(!result.accepted);
        assert_eq!(result.failed_at_round, Some(6));
        assert!(result.rejection_reason.is_some());

        // The rejected score never reached the boards.
        let standing = service
            .get_user_standing(&Period::Global, "alice")
            .await
            .unwrap();
        assert!(standing.is_none());
    }

    #[tokio::test]
    async fn valid_run_updates_both_periods_and_reports_rank() {
        let state = AppStateBuilder::new().with_known_users(&["alice", "bob"]).build();
        let service = SubmissionService::from_state(&state);

        let result = service.submit_run(faithful_run("alice", "seed-a", 13)).await;
        assert!(result.accepted);
        assert_eq!(result.new_rank, Some(1));

        let global = service
            .get_user_standing(&Period::Global, "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(global.score, 12);

        let weekly_period = Period::weekly_for(state.clock.now());
        let weekly = service
            .get_user_standing(&weekly_period, "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(weekly.score, 12);
    }

    #[tokio::test]
    async fn overtakes_are_deduplicated_across_periods_and_notified() {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppStateBuilder::new()
            .with_known_users(&["alice", "bob"])
            .with_notifier(notifier.clone())
            .build();
        let service = SubmissionService::from_state(&state);

        // Bob leads both boards, then Alice passes him on both with one run.
        service.submit_run(faithful_run("bob", "seed-b", 6)).await;
        let result = service.submit_run(faithful_run("alice", "seed-a", 13)).await;

        assert!(result.accepted);
        let overtaken: Vec<&str> = result
            .overtakes
            .iter()
            .map(|e| e.overtaken_user_id.as_str())
            .collect();
        assert_eq!(overtaken, vec!["bob"], "bob appears once despite both boards");

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "bob");
        assert_eq!(sent[0].2["by"], "alice-display");
    }

    #[tokio::test]
    async fn guest_runs_are_accepted_but_never_ranked() {
        let state = AppStateBuilder::new().build();
        let service = SubmissionService::from_state(&state);

        let result = service.submit_run(faithful_run("guest-77", "seed-g", 13)).await;
        assert!(result.accepted);
        assert_eq!(result.new_rank, None);
        assert!(result.overtakes.is_empty());

        let standing = service
            .get_user_standing(&Period::Global, "guest-77")
            .await
            .unwrap();
        assert!(standing.is_none());
    }

    #[tokio::test]
    async fn resubmitting_a_lower_score_changes_nothing() {
        let state = AppStateBuilder::new().build();
        let service = SubmissionService::from_state(&state);

        service.submit_run(faithful_run("alice", "seed-1", 9)).await;
        let before = service
            .get_user_standing(&Period::Global, "alice")
            .await
            .unwrap()
            .unwrap();

        let result = service.submit_run(faithful_run("alice", "seed-2", 5)).await;
        assert!(result.accepted);
        assert!(result.overtakes.is_empty());

        let after = service
            .get_user_standing(&Period::Global, "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.score, after.score);
        assert_eq!(after.score, 8);
    }
}
