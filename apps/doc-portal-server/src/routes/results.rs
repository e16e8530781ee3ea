//! Result file serving
//!
//! Serves the artifacts the external worker reported for a document.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::error::{AppError, Result};
use crate::storage::StorageError;
use crate::state::AppState;

/// Create the results router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pdf/:doc_id", get(get_pdf))
        .route("/json/:doc_id", get(get_json))
}

/// GET /api/results/pdf/:doc_id
async fn get_pdf(State(state): State<AppState>, Path(doc_id): Path<String>) -> Result<Response> {
    let path = state
        .lifecycle()
        .get(&doc_id)
        .await?
        .result_pdf_path
        .ok_or_else(|| AppError::NotFound("PDF not found".to_string()))?;

    serve_artifact(&state, &path, "application/pdf", "PDF not found").await
}

/// GET /api/results/json/:doc_id
async fn get_json(State(state): State<AppState>, Path(doc_id): Path<String>) -> Result<Response> {
    let path = state
        .lifecycle()
        .get(&doc_id)
        .await?
        .result_json_path
        .ok_or_else(|| AppError::NotFound("JSON not found".to_string()))?;

    serve_artifact(&state, &path, "application/json", "JSON not found").await
}

async fn serve_artifact(
    state: &AppState,
    path: &str,
    content_type: &'static str,
    missing: &str,
) -> Result<Response> {
    let data = match state.storage().read(path).await {
        Ok(data) => data,
        Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path, "Referenced result file is gone");
            return Err(AppError::NotFound(missing.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", disposition_file_name(path)),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// File name for `Content-Disposition`, reduced to header-safe characters
fn disposition_file_name(path: &str) -> String {
    let name: String = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if name.trim().is_empty() {
        "result".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_file_name() {
        assert_eq!(disposition_file_name("/r/d1.pdf"), "d1.pdf");
        assert_eq!(disposition_file_name("/r/say \"hi\".pdf"), "say _hi_.pdf");
        assert_eq!(disposition_file_name("/r/a\\b\n.json"), "a_b_.json");
        assert_eq!(disposition_file_name("/r/résumé.pdf"), "r_sum_.pdf");
        assert_eq!(disposition_file_name("/"), "result");

        for path in ["/r/say \"hi\".pdf", "/r/tab\there.pdf", "/r/x\u{7f}.pdf"] {
            let value = format!("inline; filename=\"{}\"", disposition_file_name(path));
            assert!(axum::http::HeaderValue::from_str(&value).is_ok());
        }
    }
}
