pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tasks::handlers;

/// Uploaded PDFs and base64 chat attachments both arrive in the request body.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Study tools
        .route("/api/v1/notes", post(handlers::handle_notes))
        .route("/api/v1/quiz", post(handlers::handle_quiz))
        .route(
            "/api/v1/documents/study",
            post(handlers::handle_study_document),
        )
        // Career coaching
        .route(
            "/api/v1/career/report",
            post(handlers::handle_career_report),
        )
        // Tutor chat
        .route("/api/v1/chat", post(handlers::handle_chat))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
