pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::diary::handlers;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health::health_handler))
        .route("/health", get(health::health_handler))
        // Users
        .route("/api/v1/users", post(users::handle_register))
        .route("/api/v1/users/:user_id", get(users::handle_get_user))
        // Logs
        .route("/api/v1/logs", post(handlers::handle_text_log))
        .route("/api/v1/logs/photo", post(handlers::handle_photo_log))
        .route(
            "/api/v1/logs/:key/revisions",
            post(handlers::handle_revision),
        )
        .route(
            "/api/v1/health-export",
            post(handlers::handle_health_export),
        )
        // Summaries
        .route(
            "/api/v1/summary/daily",
            post(handlers::handle_daily_summary),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
