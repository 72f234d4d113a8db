pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::cv::handlers as cv;
use crate::interview::handlers as interview;
use crate::jobpost::handlers as jobpost;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job-post conversations
        .route(
            "/api/v1/job-posts/sessions/:id/messages",
            post(jobpost::handle_message),
        )
        .route(
            "/api/v1/job-posts/sessions/:id",
            get(jobpost::handle_get_session).delete(jobpost::handle_delete_session),
        )
        .route("/api/v1/job-posts/normalize", post(jobpost::handle_normalize))
        // Voice interviews
        .route("/api/v1/interviews/context", get(interview::handle_get_context))
        // CV parsing
        .route("/api/v1/cv/parse", post(cv::handle_parse_cv))
        .with_state(state)
}
