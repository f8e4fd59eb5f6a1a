use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::clock::Clock;
use crate::identity::IdentityService;
use crate::notify::NotificationTrigger;
use crate::overtake::OvertakeConfig;
use crate::position::PositionRepository;
use crate::prize::{PrizeArchiveRepository, PrizeConfig};
use crate::replay::{TimerRules, TokenPoolProvider, ValidatorConfig};
use crate::score::ScoreRepository;
use crate::weekly::WeeklyStatsRepository;

/// Engine-wide tunables, grouped by the component they feed.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub validator: ValidatorConfig,
    pub overtake: OvertakeConfig,
    pub prize: PrizeConfig,
}

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub score_repository: Arc<dyn ScoreRepository>,
    pub weekly_repository: Arc<dyn WeeklyStatsRepository>,
    pub position_repository: Arc<dyn PositionRepository>,
    pub prize_repository: Arc<dyn PrizeArchiveRepository>,
    pub identity: Arc<IdentityService>,
    pub notifier: Arc<dyn NotificationTrigger>,
    pub token_pool: Arc<dyn TokenPoolProvider>,
    pub timer_rules: Arc<dyn TimerRules>,
    pub clock: Arc<dyn Clock>,
    pub config: EngineConfig,
}

impl AppState {
    /// Storage reachability, surfaced as an explicit result rather than a
    /// null-returning getter.
    pub async fn health_check(&self) -> Result<(), AppError> {
        self.score_repository.health_check().await
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::StoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "leaderboard temporarily unavailable".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
