//! Lifecycle service
//!
//! Runs a transition in three steps: check everything that can fail, commit
//! to the store, then publish. A check failure leaves the store untouched
//! and publishes nothing. Publishing cannot fail or block, so once the
//! commit succeeds the operation succeeds.
//!
//! Events and return values describe the row the store committed, never a
//! locally computed copy, so a transition that lands concurrently on the same
//! document is reflected in what observers see.

use chrono::Utc;
use std::sync::Arc;

use super::error::{LifecycleError, Result};
use super::transition::Transition;
use crate::db::{DocumentRecord, DocumentStore};
use crate::events::{DocumentEvent, EventBus, EventKind};
use crate::storage::ArtifactStore;

/// A document about to be registered after its file was stored
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub original_name: String,
    pub doc_type: Option<String>,
}

/// Producer-side entry point for every document state change
#[derive(Clone)]
pub struct DocumentLifecycle {
    store: Arc<dyn DocumentStore>,
    artifacts: Arc<dyn ArtifactStore>,
    bus: EventBus,
}

impl DocumentLifecycle {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        artifacts: Arc<dyn ArtifactStore>,
        bus: EventBus,
    ) -> Self {
        Self {
            store,
            artifacts,
            bus,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get(&self, id: &str) -> Result<DocumentRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<DocumentRecord>> {
        Ok(self.store.list().await?)
    }

    // ========================================================================
    // Producers
    // ========================================================================

    /// Record a new upload as `queued`
    pub async fn register_upload(&self, new: NewDocument) -> Result<DocumentRecord> {
        let record = DocumentRecord::queued(
            new.id,
            new.original_name,
            new.doc_type,
            Utc::now().to_rfc3339(),
        );

        self.store.create(&record).await?;

        let event = DocumentEvent::for_record(EventKind::Uploaded, &record);
        let delivered = self.bus.publish(&event.topic(), event);

        tracing::info!(
            doc_id = %record.id,
            original_name = %record.original_name,
            delivered,
            "Document queued"
        );

        Ok(record)
    }

    pub async fn start_processing(&self, id: &str) -> Result<DocumentRecord> {
        self.apply(id, Transition::StartProcessing).await
    }

    pub async fn mark_ready(
        &self,
        id: &str,
        pdf_path: Option<String>,
        json_path: Option<String>,
    ) -> Result<DocumentRecord> {
        self.apply(id, Transition::mark_ready(pdf_path, json_path)).await
    }

    pub async fn mark_error(&self, id: &str, message: impl Into<String>) -> Result<DocumentRecord> {
        self.apply(id, Transition::mark_error(message)).await
    }

    pub async fn approve(&self, id: &str) -> Result<DocumentRecord> {
        self.apply(id, Transition::Approve).await
    }

    /// Validate, commit, publish
    pub async fn apply(&self, id: &str, transition: Transition) -> Result<DocumentRecord> {
        transition.validate()?;

        let current = self.get(id).await?;

        for reference in transition.references() {
            if !self.artifacts.exists(reference).await {
                tracing::warn!(
                    doc_id = %id,
                    transition = transition.name(),
                    reference = %reference,
                    "Result reference does not exist"
                );
                return Err(LifecycleError::InvalidReference(reference.to_string()));
            }
        }

        let next = self
            .store
            .update(id, &transition.update())
            .await?
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;

        let event = transition.event(&next);
        let delivered = self.bus.publish(&event.topic(), event);

        tracing::info!(
            doc_id = %id,
            transition = transition.name(),
            from = %current.status,
            to = %next.status,
            delivered,
            "Document transitioned"
        );

        Ok(next)
    }
}
