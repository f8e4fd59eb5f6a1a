pub mod service;
pub mod types;

pub use service::{OvertakeConfig, OvertakeDetector};
pub use types::{OvertakeEvent, SubmissionOutcome};
