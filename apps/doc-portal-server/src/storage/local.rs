//! Local filesystem storage

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

use super::{ArtifactStore, StorageError};
use crate::config::StorageConfig;

/// Extensions accepted on upload (compared lowercase)
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "tif", "tiff"];

/// Worker-facing metadata written next to each upload
#[derive(Serialize)]
struct UploadMeta<'a> {
    doc_id: &'a str,
    #[serde(rename = "type")]
    doc_type: &'a str,
}

/// Filesystem-backed storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    incoming_root: PathBuf,
    results_root: PathBuf,
}

impl LocalStorage {
    pub fn new(incoming_root: impl Into<PathBuf>, results_root: impl Into<PathBuf>) -> Self {
        Self {
            incoming_root: incoming_root.into(),
            results_root: results_root.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.incoming_root(), config.results_root())
    }

    /// Create the storage directories if missing
    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.incoming_root).await?;
        tokio::fs::create_dir_all(&self.results_root).await?;
        Ok(())
    }

    /// Store an uploaded original and its `meta.json`
    ///
    /// Returns the path of the stored file.
    pub async fn save_upload(
        &self,
        doc_id: &str,
        file_name: &str,
        data: &[u8],
        doc_type: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        validate_file_name(file_name)?;
        validate_extension(file_name)?;

        let folder = self.incoming_root.join(doc_id);
        tokio::fs::create_dir_all(&folder).await?;

        let file_path = folder.join(file_name);
        tokio::fs::write(&file_path, data).await?;

        let meta = UploadMeta {
            doc_id,
            doc_type: doc_type.unwrap_or("document"),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;
        tokio::fs::write(folder.join("meta.json"), meta_json).await?;

        tracing::debug!(
            doc_id = %doc_id,
            path = %file_path.display(),
            size = data.len(),
            "Stored upload"
        );

        Ok(file_path)
    }

    /// Remove an upload folder whose document was never registered
    ///
    /// A folder that is already gone is not an error.
    pub async fn discard_upload(&self, doc_id: &str) -> Result<(), StorageError> {
        validate_file_name(doc_id)?;

        match tokio::fs::remove_dir_all(self.incoming_root.join(doc_id)).await {
            Ok(()) => {
                tracing::debug!(doc_id = %doc_id, "Discarded upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a stored artifact
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        Ok(tokio::fs::read(path).await?)
    }

    /// Overwrite a JSON artifact with `value`, pretty-printed
    pub async fn write_json<T: Serialize>(&self, path: &str, value: &T) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for LocalStorage {
    async fn exists(&self, reference: &str) -> bool {
        match tokio::fs::metadata(reference).await {
            Ok(metadata) => metadata.is_file(),
            Err(_) => false,
        }
    }
}

/// Reject upload extensions outside `ALLOWED_EXTENSIONS`
pub fn validate_extension(file_name: &str) -> Result<(), StorageError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(StorageError::UnsupportedFileType(format!(".{}", ext)))
    }
}

/// Upload names must be a single plain path component
fn validate_file_name(file_name: &str) -> Result<(), StorageError> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !file_name.contains('\\') => Ok(()),
        _ => Err(StorageError::InvalidFileName(file_name.to_string())),
    }
}
