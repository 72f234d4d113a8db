use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::jobpost::agent::{TurnRequest, TurnResponse};
use crate::jobpost::normalize::JobPostPayload;
use crate::jobpost::session::ConversationSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub utterance: String,
    pub company_id: String,
    #[serde(default)]
    pub company_name: Option<String>,
}

/// POST /api/v1/job-posts/sessions/:id/messages
pub async fn handle_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let response = state
        .agent
        .ingest(TurnRequest {
            session_id,
            utterance: req.utterance,
            company_id: req.company_id,
            company_name: req.company_name,
        })
        .await?;
    Ok(Json(response))
}

/// GET /api/v1/job-posts/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ConversationSession>, AppError> {
    Ok(Json(state.agent.get_session(&session_id).await?))
}

/// DELETE /api/v1/job-posts/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.agent.delete_session(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/job-posts/normalize
pub async fn handle_normalize(
    State(state): State<AppState>,
    Json(draft): Json<Value>,
) -> Result<Json<JobPostPayload>, AppError> {
    let payload = state
        .agent
        .pipeline()
        .transform(&draft)
        .map_err(AppError::InvalidDraft)?;
    Ok(Json(payload))
}
