pub mod repository;
pub mod service;
pub mod types;

pub use repository::{InMemoryPositionRepository, PositionRepository};
pub use service::PositionChangeTracker;
pub use types::{Direction, PositionChange};
