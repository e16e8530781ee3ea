//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::SqliteDocumentStore;
use crate::events::EventBus;
use crate::lifecycle::DocumentLifecycle;
use crate::storage::LocalStorage;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    storage: LocalStorage,
    bus: EventBus,
    lifecycle: DocumentLifecycle,
}

impl AppState {
    /// Wire the store, file storage and event bus together
    ///
    /// The bus is created here, once per process, and shared by every
    /// producer and stream session.
    pub fn new(config: Config, db: SqlitePool, storage: LocalStorage) -> Self {
        let bus = EventBus::new(config.events.queue);
        let lifecycle = DocumentLifecycle::new(
            Arc::new(SqliteDocumentStore::new(db)),
            Arc::new(storage.clone()),
            bus.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                bus,
                lifecycle,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the file storage
    pub fn storage(&self) -> &LocalStorage {
        &self.inner.storage
    }

    /// Get the event bus
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Get the lifecycle service
    pub fn lifecycle(&self) -> &DocumentLifecycle {
        &self.inner.lifecycle
    }

    /// Release every event stream so graceful shutdown can finish
    pub fn shutdown(&self) {
        tracing::info!("Shutting down application state...");
        self.inner.bus.close();
    }
}
