pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::coaching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Streaming (text/event-stream)
        .route("/api/optimize-resume", post(handlers::handle_optimize_resume))
        .route(
            "/api/interview-questions",
            post(handlers::handle_interview_questions),
        )
        .route("/api/mock-interview", post(handlers::handle_mock_interview))
        .route("/api/chat", post(handlers::handle_chat))
        // Non-streaming
        .route("/api/job-intel", post(handlers::handle_job_intel))
        .with_state(state)
}
