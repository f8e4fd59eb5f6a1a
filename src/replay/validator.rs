use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::models::{RunRecord, TokenSnapshot};
use super::sequence::TokenSequencer;
use super::timer::TimerRules;

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Runs claiming at least this streak get the full replay check;
    /// anything below is accepted without replay cost.
    pub verification_threshold: u32,
    /// Slack added to every round's time limit for network latency.
    pub network_buffer: Duration,
    /// Guesses faster than this are treated as bot play.
    pub min_guess_interval: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            verification_threshold: 10,
            network_buffer: Duration::seconds(2),
            min_guess_interval: Duration::milliseconds(100),
        }
    }
}

/// The validator's judgement on one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayVerdict {
    pub valid: bool,
    pub failed_at_round: Option<u32>,
    pub reason: Option<String>,
}

impl ReplayVerdict {
    fn pass() -> Self {
        Self {
            valid: true,
            failed_at_round: None,
            reason: None,
        }
    }

    fn fail(round: u32, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            failed_at_round: Some(round),
            reason: Some(reason.into()),
        }
    }

    fn fail_run(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            failed_at_round: None,
            reason: Some(reason.into()),
        }
    }
}

/// Decides whether a submitted run is achievable without fabrication, by
/// reproducing the token-pair sequence from the run's seed and checking the
/// guess log against it round by round. No real time is replayed; only the
/// recorded timestamps are examined.
pub struct ReplayValidator {
    timer_rules: Arc<dyn TimerRules>,
    config: ValidatorConfig,
}

impl ReplayValidator {
    pub fn new(timer_rules: Arc<dyn TimerRules>, config: ValidatorConfig) -> Self {
        Self {
            timer_rules,
            config,
        }
    }

    pub fn requires_validation(&self, claimed_streak: u32) -> bool {
        claimed_streak >= self.config.verification_threshold
    }

    #[instrument(skip(self, run, snapshot), fields(run_id = %run.run_id, user_id = %run.user_id))]
    pub fn validate(&self, run: &RunRecord, snapshot: &TokenSnapshot) -> ReplayVerdict {
        if run.guesses.is_empty() {
            return ReplayVerdict::fail_run("empty guess log");
        }

        let mut sequencer = match TokenSequencer::new(&run.seed, snapshot) {
            Ok(sequencer) => sequencer,
            Err(e) => return ReplayVerdict::fail_run(e.to_string()),
        };

        let last_index = run.guesses.len() - 1;
        let mut previous_timestamp = run.started_at;

        for (index, guess) in run.guesses.iter().enumerate() {
            let round = index as u32 + 1;

            if guess.round_number != round {
                return ReplayVerdict::fail(round, format!("round numbering gap at round {round}"));
            }

            let (expected_current, expected_next) = sequencer.pair();
            if guess.current_token_id != expected_current || guess.next_token_id != expected_next {
                debug!(
                    round,
                    expected_current,
                    expected_next,
                    got_current = %guess.current_token_id,
                    got_next = %guess.next_token_id,
                    "Token pair mismatch"
                );
                return ReplayVerdict::fail(
                    round,
                    format!("token pair does not match the seeded sequence at round {round}"),
                );
            }

            let elapsed = guess.timestamp - previous_timestamp;
            if elapsed < self.config.min_guess_interval {
                return ReplayVerdict::fail(round, format!("guess at round {round} was implausibly fast"));
            }
            let allowed = self.timer_rules.time_limit(round) + self.config.network_buffer;
            if elapsed > allowed {
                return ReplayVerdict::fail(
                    round,
                    format!("guess at round {round} exceeded the round time limit"),
                );
            }
            previous_timestamp = guess.timestamp;

            // Sequence matched, so both ids are present in the snapshot.
            let (Some(current_cap), Some(next_cap)) = (
                snapshot.market_cap(&guess.current_token_id),
                snapshot.market_cap(&guess.next_token_id),
            ) else {
                return ReplayVerdict::fail(round, format!("token missing from snapshot at round {round}"));
            };

            let correct = guess.guess.matches(current_cap, next_cap);
            if index < last_index && !correct {
                return ReplayVerdict::fail(
                    round,
                    format!("run continued past a losing guess at round {round}"),
                );
            }
            if index == last_index && correct {
                return ReplayVerdict::fail(round, "final guess did not lose");
            }

            if index < last_index {
                sequencer.advance();
            }
        }

        // A consumed reprieve drops the discarded losing guess from the log
        // but still credits the round.
        let reconciled = run.guesses.len() as u32 - 1 + run.reprieves_used;
        if run.claimed_streak != reconciled {
            return ReplayVerdict::fail(
                last_index as u32 + 1,
                format!(
                    "claimed streak {} does not reconcile with {} logged guesses and {} reprieves",
                    run.claimed_streak,
                    run.guesses.len(),
                    run.reprieves_used
                ),
            );
        }

        ReplayVerdict::pass()
    }
}
