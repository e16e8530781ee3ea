//! Lifecycle transitions
//!
//! Pure rules: what a transition requires, what it writes, and which event
//! describes it. Nothing here touches storage.
//!
//! Every transition is accepted from every current status. A transition
//! into a status that cannot carry results (`processing`, `error`) clears
//! both result references so they only ever exist on `ready`/`approved`
//! documents.

use super::error::{LifecycleError, Result};
use super::status::DocumentStatus;
use crate::db::{DocumentRecord, DocumentUpdate};
use crate::events::{DocumentEvent, EventKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    StartProcessing,
    MarkReady {
        pdf_path: Option<String>,
        json_path: Option<String>,
    },
    MarkError {
        message: String,
    },
    Approve,
}

impl Transition {
    /// Result-ready transition; empty references count as absent
    pub fn mark_ready(pdf_path: Option<String>, json_path: Option<String>) -> Self {
        Transition::MarkReady {
            pdf_path: pdf_path.filter(|p| !p.is_empty()),
            json_path: json_path.filter(|p| !p.is_empty()),
        }
    }

    pub fn mark_error(message: impl Into<String>) -> Self {
        Transition::MarkError {
            message: message.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::StartProcessing => "start_processing",
            Transition::MarkReady { .. } => "mark_ready",
            Transition::MarkError { .. } => "mark_error",
            Transition::Approve => "approve",
        }
    }

    /// Status the document ends up in
    pub fn target(&self) -> DocumentStatus {
        match self {
            Transition::StartProcessing => DocumentStatus::Processing,
            Transition::MarkReady { .. } => DocumentStatus::Ready,
            Transition::MarkError { .. } => DocumentStatus::Error,
            Transition::Approve => DocumentStatus::Approved,
        }
    }

    pub fn event_kind(&self) -> EventKind {
        match self {
            Transition::StartProcessing => EventKind::ProcessingStarted,
            Transition::MarkReady { .. } => EventKind::ResultReady,
            Transition::MarkError { .. } => EventKind::Error,
            Transition::Approve => EventKind::Approved,
        }
    }

    /// Argument checks that need no collaborator
    pub fn validate(&self) -> Result<()> {
        match self {
            Transition::MarkError { message } if message.trim().is_empty() => Err(
                LifecycleError::InvalidArgument("error_message is required".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Result references that must resolve before the transition may commit
    pub fn references(&self) -> Vec<&str> {
        match self {
            Transition::MarkReady {
                pdf_path,
                json_path,
            } => pdf_path
                .iter()
                .chain(json_path.iter())
                .map(String::as_str)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Fields written to the store
    pub fn update(&self) -> DocumentUpdate {
        let update = DocumentUpdate::status(self.target());
        match self {
            Transition::MarkReady {
                pdf_path,
                json_path,
            } => update.with_results(pdf_path.clone(), json_path.clone()),
            Transition::StartProcessing | Transition::MarkError { .. } => update.clear_results(),
            Transition::Approve => update,
        }
    }

    /// Event describing the transition, built from the committed record
    pub fn event(&self, record: &DocumentRecord) -> DocumentEvent {
        let event = DocumentEvent::for_record(self.event_kind(), record);
        match self {
            Transition::MarkError { message } => event.with_message(message.clone()),
            _ => event,
        }
    }
}
