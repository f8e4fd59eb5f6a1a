use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use capstreak::clock::ManualClock;
use capstreak::identity::{IdentityService, IdentityServiceConfig, ResolvedProfile, StaticIdentityResolver};
use capstreak::notify::{NotificationKind, NotificationTrigger};
use capstreak::position::InMemoryPositionRepository;
use capstreak::prize::InMemoryPrizeArchiveRepository;
use capstreak::replay::{
    Guess, GuessRecord, RunRecord, StandardTimerRules, StaticTokenPool, TokenInfo, TokenSequencer,
    TokenSnapshot,
};
use capstreak::score::InMemoryScoreRepository;
use capstreak::shared::{AppState, EngineConfig};
use capstreak::weekly::InMemoryWeeklyStatsRepository;

/// Notifier that records every trigger so tests can assert on the
/// fire-and-forget path.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, NotificationKind, serde_json::Value)>>,
}

#[async_trait]
impl NotificationTrigger for RecordingNotifier {
    async fn notify(&self, user_id: &str, kind: NotificationKind, payload: serde_json::Value) {
        let mut sent = self.sent.lock().await;
        sent.push((user_id.to_string(), kind, payload));
    }
}

pub struct TestSetup {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub snapshot: TokenSnapshot,
}

pub struct TestSetupBuilder {
    known_users: Vec<String>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            known_users: Vec::new(),
        }
    }

    /// Users the identity resolver will recognize.
    pub fn with_known_users(mut self, users: &[&str]) -> Self {
        self.known_users = users.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn build(self) -> TestSetup {
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2026, 8, 4, 12, 0, 0).unwrap(),
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let snapshot = test_token_snapshot();

        let profiles = self
            .known_users
            .iter()
            .map(|user| {
                (
                    user.clone(),
                    ResolvedProfile {
                        display_name: format!("{user}-display"),
                        avatar_url: Some(format!("https://cdn.example/{user}.png")),
                    },
                )
            })
            .collect();
        let identity = Arc::new(IdentityService::new(
            Arc::new(StaticIdentityResolver::with_profiles(profiles)),
            clock.clone(),
            IdentityServiceConfig::default(),
        ));

        let state = AppState {
            score_repository: Arc::new(InMemoryScoreRepository::new()),
            weekly_repository: Arc::new(InMemoryWeeklyStatsRepository::new()),
            position_repository: Arc::new(InMemoryPositionRepository::new()),
            prize_repository: Arc::new(InMemoryPrizeArchiveRepository::new()),
            identity,
            notifier: notifier.clone(),
            token_pool: Arc::new(StaticTokenPool::new(snapshot.clone())),
            timer_rules: Arc::new(StandardTimerRules::new()),
            clock: clock.clone(),
            config: EngineConfig::default(),
        };

        TestSetup {
            state,
            clock,
            notifier,
            snapshot,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ten tokens with distinct market caps.
pub fn test_token_snapshot() -> TokenSnapshot {
    TokenSnapshot::new(
        (0..10)
            .map(|i| TokenInfo {
                token_id: format!("token-{i}"),
                market_cap: (i as u64 + 1) * 1_000,
            })
            .collect(),
    )
}

pub fn run_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 4, 11, 0, 0).unwrap()
}

/// Plays the seeded sequence faithfully: every non-final guess correct, the
/// final guess losing, two seconds between guesses. Claimed streak is
/// `rounds - 1`.
pub fn faithful_run(
    user_id: &str,
    seed: &str,
    rounds: usize,
    snapshot: &TokenSnapshot,
) -> RunRecord {
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
