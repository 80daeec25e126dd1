use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::ats::models::{compose_form_text, AnalyzeDataRequest, UploadedDocument};
use crate::ats::normalize::normalize_text;
use crate::ats::orchestrator::{analyze_document, respond_within};
use crate::ats::scoring::{score_resume, AtsReport};
use crate::errors::AppError;
use crate::state::AppState;

/// Multipart field carrying the résumé file.
const RESUME_FIELD: &str = "resume";

/// POST /api/ats-analyze-file
pub async fn handle_analyze_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AtsReport>, AppError> {
    let request_id = short_request_id();
    let limit = state.config.pipeline.max_upload_bytes;

    let document = read_resume_part(&mut multipart, limit)
        .await?
        .ok_or(AppError::MissingFile)?;

    let extractor = state.extractor.clone();
    let pipeline = state.config.pipeline.clone();
    let budget = pipeline.request_timeout;
    let report = respond_within(budget, async move {
        analyze_document(&extractor, &pipeline, document, &request_id).await
    })
    .await?;

    Ok(Json(report))
}

/// POST /api/ats-analyze-data
pub async fn handle_analyze_data(
    payload: Result<Json<AnalyzeDataRequest>, JsonRejection>,
) -> Result<Json<AtsReport>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let data = request
        .data
        .ok_or_else(|| AppError::Validation("Dados não fornecidos".to_string()))?;

    let text = normalize_text(&compose_form_text(&data));
    Ok(Json(score_resume(&text)))
}

/// Returns the first `resume` part; other parts are skipped.
async fn read_resume_part(
    multipart: &mut Multipart,
    limit_bytes: usize,
) -> Result<Option<UploadedDocument>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit_bytes))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, limit_bytes))?;
        return Ok(Some(UploadedDocument::new(bytes, content_type, file_name)));
    }
    Ok(None)
}

fn multipart_error(err: MultipartError, limit_bytes: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit_bytes }
    } else {
        AppError::Upload(err.body_text())
    }
}

fn short_request_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
