// Library crate for the capstreak leaderboard engine
// This file exposes the public API for integration tests

pub mod clock;
pub mod identity;
pub mod notify;
pub mod overtake;
pub mod position;
pub mod prize;
pub mod replay;
pub mod score;
pub mod shared;
pub mod submission;
pub mod weekly;

// Re-export commonly used types for easier access in tests
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{DisplayIdentity, IdentityResolver, IdentityService, IdentityServiceConfig};
pub use notify::{LoggingNotifier, NotificationKind, NotificationTrigger};
pub use overtake::{OvertakeConfig, OvertakeDetector, OvertakeEvent, SubmissionOutcome};
pub use position::{Direction, PositionChange, PositionChangeTracker};
pub use prize::{PercentageTable, PrizeAward, PrizeDistributionService};
pub use replay::{
    Guess, GuessRecord, ReplayValidator, ReplayVerdict, RunRecord, TokenSequencer, TokenSnapshot,
};
pub use score::{Period, RankedEntry, ScoreRepository};
pub use shared::{AppError, AppState, EngineConfig};
pub use submission::{SubmissionResult, SubmissionService};
pub use weekly::{WeeklyScoreAggregator, WeeklyStats};
