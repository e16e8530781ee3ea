//! Database module for SQLite persistence
//!
//! Holds the document records. Everything else the server knows about a
//! document lives on disk (originals, results) or only in memory (events).

mod documents;
mod schema;

pub use documents::*;
pub use schema::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::lifecycle::ParseStatusError;

/// Document store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record {id}: {source}")]
    CorruptRecord {
        id: String,
        #[source]
        source: ParseStatusError,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory pool, schema applied
///
/// Every connection to `sqlite::memory:` opens its own database, so the pool
/// must never grow past one.
pub async fn create_memory_pool() -> StoreResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}
