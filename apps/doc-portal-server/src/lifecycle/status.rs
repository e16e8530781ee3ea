//! Document status values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a document is in the processing pipeline
///
/// ```text
/// queued ──> processing ──> ready ──> approved
///    │            │
///    └────────────┴──> error ──(approve)──> approved
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Queued,
    Processing,
    Ready,
    Error,
    Approved,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Queued => "queued",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Error => "error",
            DocumentStatus::Approved => "approved",
        }
    }

    /// No transition other than `approve` leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Approved | DocumentStatus::Error)
    }

    /// Result references may only be present in these states
    pub fn allows_results(&self) -> bool {
        matches!(self, DocumentStatus::Ready | DocumentStatus::Approved)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown document status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for DocumentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(DocumentStatus::Queued),
            "processing" => Ok(DocumentStatus::Processing),
            "ready" => Ok(DocumentStatus::Ready),
            "error" => Ok(DocumentStatus::Error),
            "approved" => Ok(DocumentStatus::Approved),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}
