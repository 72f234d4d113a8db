use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::cv::extractor::extract_cv_text;
use crate::cv::parser::ParsedCv;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CvParseResponse {
    pub file_name: Option<String>,
    pub text_length: usize,
    pub cv: ParsedCv,
}

/// POST /api/v1/cv/parse (multipart, field `file`)
pub async fn handle_parse_cv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CvParseResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;

        let text = extract_cv_text(data, content_type.as_deref()).await?;
        let cv = state.cv_parser.parse_cv(&text).await?;
        info!(
            "Parsed CV {:?} ({} chars, {} skills)",
            file_name,
            text.len(),
            cv.skills.len()
        );

        return Ok(Json(CvParseResponse {
            file_name,
            text_length: text.chars().count(),
            cv,
        }));
    }

    Err(AppError::Validation(
        "multipart field 'file' is required".to_string(),
    ))
}
