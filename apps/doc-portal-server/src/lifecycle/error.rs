//! Lifecycle error types

use thiserror::Error;

use crate::db::StoreError;

/// Why a lifecycle operation was refused
///
/// A refused operation has not touched the store and has published nothing.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No document with this id
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A required argument is missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A result reference does not resolve to an existing artifact
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// The document store itself failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
