pub mod calculator;
pub mod models;
pub mod repository;
pub mod service;

pub use calculator::calculate;
pub use models::{PercentageTable, PeriodStatus, PrizeArchiveEntry, PrizeAward, TableError};
pub use repository::{InMemoryPrizeArchiveRepository, PrizeArchiveRepository};
pub use service::{PrizeConfig, PrizeDistributionService};
