//! Notification endpoints for the external processing worker
//!
//! - POST /api/notify/processing-started `{doc_id}`
//! - POST /api/notify/result-ready `{doc_id, pdf_path?, json_path?}`
//! - POST /api/notify/error `{doc_id, error_message}`

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use super::documents::StatusOk;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the notify router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/processing-started", post(processing_started))
        .route("/result-ready", post(result_ready))
        .route("/error", post(error))
}

#[derive(Debug, Deserialize)]
pub struct ProcessingStartedPayload {
    pub doc_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultReadyPayload {
    pub doc_id: Option<String>,
    pub pdf_path: Option<String>,
    pub json_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorPayload {
    pub doc_id: Option<String>,
    pub error_message: Option<String>,
}

fn require_doc_id(doc_id: Option<String>) -> Result<String> {
    doc_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("doc_id is required".to_string()))
}

/// POST /api/notify/processing-started
async fn processing_started(
    State(state): State<AppState>,
    Json(payload): Json<ProcessingStartedPayload>,
) -> Result<Json<StatusOk>> {
    let doc_id = require_doc_id(payload.doc_id)?;
    state.lifecycle().start_processing(&doc_id).await?;
    Ok(StatusOk::ok())
}

/// POST /api/notify/result-ready
async fn result_ready(
    State(state): State<AppState>,
    Json(payload): Json<ResultReadyPayload>,
) -> Result<Json<StatusOk>> {
    let doc_id = require_doc_id(payload.doc_id)?;
    state
        .lifecycle()
        .mark_ready(&doc_id, payload.pdf_path, payload.json_path)
        .await?;
    Ok(StatusOk::ok())
}

/// POST /api/notify/error
async fn error(
    State(state): State<AppState>,
    Json(payload): Json<ErrorPayload>,
) -> Result<Json<StatusOk>> {
    let doc_id = require_doc_id(payload.doc_id)?;
    state
        .lifecycle()
        .mark_error(&doc_id, payload.error_message.unwrap_or_default())
        .await?;
    Ok(StatusOk::ok())
}
