mod clock;
mod identity;
mod notify;
mod overtake;
mod position;
mod prize;
mod replay;
mod score;
mod shared;
mod submission;
mod weekly;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clock::SystemClock;
use identity::{IdentityService, IdentityServiceConfig, StaticIdentityResolver};
use notify::LoggingNotifier;
use position::InMemoryPositionRepository;
use prize::InMemoryPrizeArchiveRepository;
use replay::{StandardTimerRules, StaticTokenPool, TokenInfo, TokenSnapshot};
use score::InMemoryScoreRepository;
use shared::{AppState, EngineConfig};
use weekly::InMemoryWeeklyStatsRepository;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capstreak=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting capstreak leaderboard engine");

    let clock = Arc::new(SystemClock::new());

    // Create shared application state with dependency injection
    // Easy to switch between implementations:
    let score_repository = Arc::new(InMemoryScoreRepository::new());

    // For production with PostgreSQL:
    // let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    // let pool = sqlx::PgPool::connect(&database_url).await.expect("Failed to connect to database");
    // let score_repository = Arc::new(score::PostgresScoreRepository::new(pool));

    let identity = Arc::new(IdentityService::new(
        Arc::new(StaticIdentityResolver::new()),
        clock.clone(),
        IdentityServiceConfig::default(),
    ));

    let app_state = AppState {
        score_repository,
        weekly_repository: Arc::new(InMemoryWeeklyStatsRepository::new()),
        position_repository: Arc::new(InMemoryPositionRepository::new()),
        prize_repository: Arc::new(InMemoryPrizeArchiveRepository::new()),
        identity,
        notifier: Arc::new(LoggingNotifier::new()),
        token_pool: Arc::new(StaticTokenPool::new(bootstrap_token_snapshot())),
        timer_rules: Arc::new(StandardTimerRules::new()),
        clock,
        config: EngineConfig::default(),
    };

    // build our application with the engine routes
    let app = Router::new()
        .route("/runs", post(submission::handlers::submit_run))
        .route(
            "/leaderboard/:period",
            get(submission::handlers::get_leaderboard),
        )
        .route(
            "/standing/:period/:user_id",
            get(submission::handlers::get_user_standing),
        )
        .route(
            "/positions/check",
            post(submission::handlers::check_position_change),
        )
        .route(
            "/periods/:period/finalize",
            post(submission::handlers::finalize_period),
        )
        .route("/health", get(submission::handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // run our app with hyper, listening globally on port 3000
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}

/// Placeholder pool until the market-data collaborator is wired in.
fn bootstrap_token_snapshot() -> TokenSnapshot {
    TokenSnapshot::new(
        [
            ("btc", 1_200_000_000_000u64),
            ("eth", 400_000_000_000),
            ("sol", 90_000_000_000),
            ("doge", 25_000_000_000),
            ("ada", 18_000_000_000),
            ("avax", 12_000_000_000),
            ("link", 10_000_000_000),
            ("dot", 8_000_000_000),
            ("uni", 6_000_000_000),
            ("atom", 4_000_000_000),
        ]
        .into_iter()
        .map(|(token_id, market_cap)| TokenInfo {
            token_id: token_id.to_string(),
            market_cap,
        })
        .collect(),
    )
}
