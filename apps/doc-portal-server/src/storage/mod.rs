//! Storage module for document files
//!
//! Originals are written under `incoming/<doc_id>/` together with a
//! `meta.json` for the external worker. Results are written by the worker
//! wherever it likes; the server only checks and serves the paths it is
//! told about.

mod local;

pub use local::{validate_extension, LocalStorage, ALLOWED_EXTENSIONS};

use async_trait::async_trait;
use thiserror::Error;

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Existence checks for externally produced artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Whether `reference` names an existing artifact
    async fn exists(&self, reference: &str) -> bool;
}
