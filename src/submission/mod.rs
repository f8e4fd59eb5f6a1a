pub mod handlers;
pub mod service;
pub mod types;

pub use service::SubmissionService;
pub use types::{PositionCheckRequest, RangeQuery, StandingResponse, SubmissionResult};
