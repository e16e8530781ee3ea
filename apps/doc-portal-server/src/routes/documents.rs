//! Document API routes
//!
//! - POST /api/upload - store an original and queue it for processing
//! - GET /api/documents - list, newest upload first
//! - GET /api/documents/:doc_id - detail with result URLs
//! - POST /api/documents/:doc_id/approve - mark reviewed
//! - PUT /api/documents/:doc_id/results - overwrite the JSON result

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::db::DocumentRecord;
use crate::error::{AppError, Result};
use crate::lifecycle::{DocumentStatus, NewDocument};
use crate::state::AppState;

/// Maximum accepted upload body
pub const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_documents))
        .route("/:doc_id", get(get_document))
        .route("/:doc_id/approve", post(approve_document))
        .route("/:doc_id/results", put(save_results))
}

/// Document as shown in the list view
#[derive(Debug, Serialize)]
pub struct DocumentListItem {
    pub id: String,
    pub original_name: String,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub status: DocumentStatus,
    pub upload_time: String,
    pub has_pdf: bool,
    pub has_json: bool,
}

impl From<&DocumentRecord> for DocumentListItem {
    fn from(doc: &DocumentRecord) -> Self {
        Self {
            id: doc.id.clone(),
            original_name: doc.original_name.clone(),
            doc_type: doc.doc_type.clone(),
            status: doc.status,
            upload_time: doc.upload_time.clone(),
            has_pdf: doc.has_pdf(),
            has_json: doc.has_json(),
        }
    }
}

/// Document detail with links to its results
#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub summary: DocumentListItem,
    pub result_pdf_url: Option<String>,
    pub result_json_url: Option<String>,
}

impl From<&DocumentRecord> for DocumentDetail {
    fn from(doc: &DocumentRecord) -> Self {
        Self {
            summary: DocumentListItem::from(doc),
            result_pdf_url: doc
                .has_pdf()
                .then(|| format!("/api/results/pdf/{}", doc.id)),
            result_json_url: doc
                .has_json()
                .then(|| format!("/api/results/json/{}", doc.id)),
        }
    }
}

#[derive(Serialize)]
pub struct StatusOk {
    pub status: &'static str,
}

impl StatusOk {
    pub fn ok() -> Json<Self> {
        Json(Self { status: "ok" })
    }
}

/// POST /api/upload
///
/// Multipart form: `file` (required) and `type` (optional classification).
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DocumentDetail>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut doc_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::BadRequest("File name is required".to_string()))?;
                let data = field.bytes().await?;
                tracing::debug!(file_name = %file_name, size = data.len(), "Received upload");
                file = Some((file_name, data.to_vec()));
            }
            "type" => {
                let value = field.text().await?;
                doc_type = Some(value).filter(|v| !v.trim().is_empty());
            }
            other => {
                tracing::debug!(field = %other, "Ignoring multipart field");
            }
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let doc_id = Uuid::new_v4().to_string();
    state
        .storage()
        .save_upload(&doc_id, &file_name, &data, doc_type.as_deref())
        .await?;

    let registered = state
        .lifecycle()
        .register_upload(NewDocument {
            id: doc_id.clone(),
            original_name: file_name,
            doc_type,
        })
        .await;

    match registered {
        Ok(record) => Ok(Json(DocumentDetail::from(&record))),
        Err(e) => {
            // Without a record the worker must not see the folder
            if let Err(cleanup) = state.storage().discard_upload(&doc_id).await {
                tracing::error!(doc_id = %doc_id, error = %cleanup, "Failed to discard upload");
            }
            Err(e.into())
        }
    }
}

/// GET /api/documents
async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<DocumentListItem>>> {
    let documents = state.lifecycle().list().await?;
    Ok(Json(documents.iter().map(DocumentListItem::from).collect()))
}

/// GET /api/documents/:doc_id
async fn get_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentDetail>> {
    let document = state.lifecycle().get(&doc_id).await?;
    Ok(Json(DocumentDetail::from(&document)))
}

/// POST /api/documents/:doc_id/approve
async fn approve_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<StatusOk>> {
    state.lifecycle().approve(&doc_id).await?;
    Ok(StatusOk::ok())
}

/// PUT /api/documents/:doc_id/results
///
/// Replaces the stored JSON result with the reviewed version.
async fn save_results(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<StatusOk>> {
    let document = state.lifecycle().get(&doc_id).await?;
    let path = document
        .result_json_path
        .ok_or_else(|| AppError::NotFound("JSON result not found".to_string()))?;

    state.storage().write_json(&path, &payload).await?;

    tracing::info!(doc_id = %doc_id, path = %path, "JSON result updated");

    Ok(StatusOk::ok())
}
