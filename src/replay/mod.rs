pub mod models;
pub mod sequence;
pub mod timer;
pub mod validator;

pub use models::{
    Guess, GuessRecord, RunRecord, StaticTokenPool, TokenInfo, TokenPoolProvider, TokenSnapshot,
};
pub use sequence::{SequenceError, TokenSequencer};
pub use timer::{StandardTimerRules, TimerRules};
pub use validator::{ReplayValidator, ReplayVerdict, ValidatorConfig};
