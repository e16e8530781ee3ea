//! Event and topic types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::db::DocumentRecord;
use crate::lifecycle::DocumentStatus;

/// A channel subscribers register under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Receives every document event
    Global,
    /// Receives events for one document id
    Document(String),
}

impl Topic {
    pub fn document(id: impl Into<String>) -> Self {
        Topic::Document(id.into())
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Topic::Global)
    }

    pub fn doc_id(&self) -> Option<&str> {
        match self {
            Topic::Global => None,
            Topic::Document(id) => Some(id),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Global => f.write_str("global"),
            Topic::Document(id) => write!(f, "document:{}", id),
        }
    }
}

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Synthesized by a stream session when it opens; never published
    Connected,
    Uploaded,
    ProcessingStarted,
    ResultReady,
    Error,
    Approved,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Uploaded => "uploaded",
            EventKind::ProcessingStarted => "processing-started",
            EventKind::ResultReady => "result-ready",
            EventKind::Error => "error",
            EventKind::Approved => "approved",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit on an event stream, serialized as a single JSON object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEvent {
    pub event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DocumentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_pdf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_json: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl DocumentEvent {
    /// Liveness confirmation carrying the topic identity
    pub fn connected(topic: &Topic) -> Self {
        Self {
            event: EventKind::Connected,
            doc_id: topic.doc_id().map(str::to_string),
            scope: topic.is_global().then_some("global"),
            status: None,
            message: None,
            has_pdf: None,
            has_json: None,
            timestamp: Utc::now(),
        }
    }

    /// Describe a committed transition of `record`
    pub fn for_record(kind: EventKind, record: &DocumentRecord) -> Self {
        Self {
            event: kind,
            doc_id: Some(record.id.clone()),
            scope: None,
            status: Some(record.status),
            message: None,
            has_pdf: Some(record.has_pdf()),
            has_json: Some(record.has_json()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Topic this event is published under
    pub fn topic(&self) -> Topic {
        match &self.doc_id {
            Some(id) => Topic::document(id.clone()),
            None => Topic::Global,
        }
    }
}
