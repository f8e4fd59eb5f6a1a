pub mod models;
pub mod repository;

pub use models::{Period, PeriodParseError, RaiseOutcome, RankedEntry};
pub use repository::{InMemoryScoreRepository, PostgresScoreRepository, ScoreRepository};
