use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::{info, instrument};

use super::service::SubmissionService;
use super::types::{
    HealthResponse, PositionCheckRequest, RangeQuery, StandingResponse, SubmissionResult,
};
use crate::position::{PositionChange, PositionChangeTracker};
use crate::prize::{PrizeAward, PrizeDistributionService};
use crate::replay::RunRecord;
use crate::score::{Period, RankedEntry};
use crate::shared::{AppError, AppState};
use std::sync::Arc;

fn parse_period(raw: &str) -> Result<Period, AppError> {
    raw.parse::<Period>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// HTTP handler for submitting a completed run
///
/// POST /runs
/// Always answers 200: rejection and degradation are carried in the body so
/// the game client's completion flow is never aborted.
#[instrument(name = "submit_run", skip(state, run))]
pub async fn submit_run(
    State(state): State<AppState>,
    Json(run): Json<RunRecord>,
) -> Json<SubmissionResult> {
    let service = SubmissionService::from_state(&state);
    let result = service.submit_run(run).await;

    info!(accepted = result.accepted, "Run submission handled");
    Json(result)
}

/// HTTP handler for reading a leaderboard slice
///
/// GET /leaderboard/:period?start=1&end=10
#[instrument(name = "get_leaderboard", skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(period): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<RankedEntry>>, AppError> {
    let period = parse_period(&period)?;
    let service = SubmissionService::from_state(&state);
    let entries = service
        .get_leaderboard(&period, range.start, range.end)
        .await?;

    info!(%period, rows = entries.len(), "Leaderboard served");
    Ok(Json(entries))
}

/// HTTP handler for one user's standing in a period
///
/// GET /standing/:period/:user_id
/// A user with no entry answers 200 with a null body: not an error.
#[instrument(name = "get_user_standing", skip(state))]
pub async fn get_user_standing(
    State(state): State<AppState>,
    Path(params): Path<(String, String)>,
) -> Result<Json<Option<StandingResponse>>, AppError> {
    let (period, user_id) = params;
    let period = parse_period(&period)?;
    let service = SubmissionService::from_state(&state);
    let standing = service.get_user_standing(&period, &user_id).await?;
    Ok(Json(standing))
}

/// HTTP handler for the cross-session position check
///
/// POST /positions/check
#[instrument(name = "check_position_change", skip(state))]
pub async fn check_position_change(
    State(state): State<AppState>,
    Json(request): Json<PositionCheckRequest>,
) -> Result<Json<PositionChange>, AppError> {
    let tracker = PositionChangeTracker::new(
        Arc::clone(&state.position_repository),
        Arc::clone(&state.score_repository),
    );
    let change = tracker
        .check_position_change(&request.user_id, &request.board)
        .await?;
    Ok(Json(change))
}

/// HTTP handler for period finalization
///
/// POST /periods/:period/finalize
/// Idempotent: an already-completed period answers with its archived
/// distribution.
#[instrument(name = "finalize_period", skip(state))]
pub async fn finalize_period(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> Result<Json<Vec<PrizeAward>>, AppError> {
    let period = parse_period(&period)?;
    let service = PrizeDistributionService::new(
        Arc::clone(&state.score_repository),
        Arc::clone(&state.prize_repository),
        Arc::clone(&state.clock),
        state.config.prize.clone(),
    );
    let distribution = service.finalize(&period).await?;

    info!(%period, awards = distribution.len(), "Finalization handled");
    Ok(Json(distribution))
}

/// GET /health
#[instrument(name = "health", skip(state))]
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.health_check().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
