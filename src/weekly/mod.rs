pub mod models;
pub mod repository;
pub mod service;

pub use models::{is_guest, WeeklyStats};
pub use repository::{InMemoryWeeklyStatsRepository, WeeklyStatsRepository};
pub use service::WeeklyScoreAggregator;
