use chrono::Duration;

/// Per-round answer time limit, supplied by the game-rules layer.
///
/// A step function of the round index mirroring the game's difficulty
/// schedule: later rounds leave less time to answer.
pub trait TimerRules: Send + Sync {
    fn time_limit(&self, round_number: u32) -> Duration;
}

/// The stock difficulty schedule.
pub struct StandardTimerRules;

impl StandardTimerRules {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StandardTimerRules {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerRules for StandardTimerRules {
    fn time_limit(&self, round_number: u32) -> Duration {
        match round_number {
            0..=5 => Duration::seconds(15),
            6..=10 => Duration::seconds(12),
            11..=20 => Duration::seconds(8),
            _ => Duration::seconds(5),
        }
    }
}
