use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::interview::context::InterviewContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    pub room: String,
    /// Raw participant metadata (JSON string), used when the room name has no id.
    #[serde(default)]
    pub metadata: Option<String>,
}

/// GET /api/v1/interviews/context?room=...&metadata=...
pub async fn handle_get_context(
    State(state): State<AppState>,
    Query(params): Query<ContextQuery>,
) -> Result<Json<InterviewContext>, AppError> {
    let context = state
        .interviews
        .resolve(&params.room, params.metadata.as_deref())
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(Json(context))
}
