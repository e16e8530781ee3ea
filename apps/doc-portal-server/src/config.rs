//! Configuration management for Doc Portal Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Default per-subscriber queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Largest capacity a tokio channel accepts
pub const MAX_QUEUE_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root for everything the server writes to disk
    pub root: PathBuf,
}

impl StorageConfig {
    /// Uploaded originals, one folder per document
    pub fn incoming_root(&self) -> PathBuf {
        self.root.join("incoming")
    }

    /// Processing results written by the external worker
    pub fn results_root(&self) -> PathBuf {
        self.root.join("results")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    pub queue: QueuePolicy,
}

/// Capacity policy for subscriber delivery queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuePolicy {
    /// Memory is the only limit
    Unbounded,
    /// At most `n` pending events; further events are dropped for that subscriber
    Bounded(usize),
}

impl QueuePolicy {
    /// Parse `EVENT_QUEUE_CAPACITY` style values: `0`/`unbounded` or a positive integer
    ///
    /// Capacities above [`MAX_QUEUE_CAPACITY`] are clamped to it.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("unbounded") {
            return Some(QueuePolicy::Unbounded);
        }
        match value.parse::<usize>().ok()? {
            0 => Some(QueuePolicy::Unbounded),
            n if n > MAX_QUEUE_CAPACITY => {
                tracing::warn!(
                    requested = n,
                    max = MAX_QUEUE_CAPACITY,
                    "Queue capacity too large, clamping"
                );
                Some(QueuePolicy::Bounded(MAX_QUEUE_CAPACITY))
            }
            n => Some(QueuePolicy::Bounded(n)),
        }
    }
}

impl Default for QueuePolicy {
    fn default() -> Self {
        QueuePolicy::Bounded(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8808,
            },
            storage: StorageConfig {
                root: PathBuf::from("./storage"),
            },
            database: DatabaseConfig {
                url: "sqlite:./storage/documents.db".to_string(),
            },
            events: EventsConfig {
                queue: QueuePolicy::default(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let storage_root = env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./storage"));

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!("sqlite:{}", storage_root.join("documents.db").display())
        });

        let queue = match env::var("EVENT_QUEUE_CAPACITY") {
            Ok(raw) => QueuePolicy::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Invalid EVENT_QUEUE_CAPACITY, using default");
                QueuePolicy::default()
            }),
            Err(_) => QueuePolicy::default(),
        };

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8808".to_string())
                    .parse()
                    .unwrap_or(8808),
            },
            storage: StorageConfig { root: storage_root },
            database: DatabaseConfig { url: database_url },
            events: EventsConfig { queue },
        }
    }
}
