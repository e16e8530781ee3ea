//! Document record persistence

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{StoreError, StoreResult};
use crate::lifecycle::DocumentStatus;

/// Document record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub original_name: String,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub status: DocumentStatus,
    pub upload_time: String,
    pub result_pdf_path: Option<String>,
    pub result_json_path: Option<String>,
}

impl DocumentRecord {
    /// A freshly uploaded document
    pub fn queued(
        id: impl Into<String>,
        original_name: impl Into<String>,
        doc_type: Option<String>,
        upload_time: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            original_name: original_name.into(),
            doc_type,
            status: DocumentStatus::Queued,
            upload_time: upload_time.into(),
            result_pdf_path: None,
            result_json_path: None,
        }
    }

    pub fn has_pdf(&self) -> bool {
        self.result_pdf_path.is_some()
    }

    pub fn has_json(&self) -> bool {
        self.result_json_path.is_some()
    }
}

/// Partial update of a document record
///
/// `None` leaves a field untouched. For the result references,
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub status: Option<DocumentStatus>,
    pub result_pdf_path: Option<Option<String>>,
    pub result_json_path: Option<Option<String>>,
}

impl DocumentUpdate {
    pub fn status(status: DocumentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_results(mut self, pdf: Option<String>, json: Option<String>) -> Self {
        self.result_pdf_path = Some(pdf);
        self.result_json_path = Some(json);
        self
    }

    pub fn clear_results(self) -> Self {
        self.with_results(None, None)
    }
}

/// Document record storage
///
/// Each call is atomic for the single record it touches. There are no
/// cross-record transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a record by id
    async fn get(&self, id: &str) -> StoreResult<Option<DocumentRecord>>;

    /// Insert a new record
    async fn create(&self, record: &DocumentRecord) -> StoreResult<()>;

    /// Apply a partial update and return the record as committed
    ///
    /// `None` when no record has this id.
    async fn update(
        &self,
        id: &str,
        update: &DocumentUpdate,
    ) -> StoreResult<Option<DocumentRecord>>;

    /// All records, newest upload first
    async fn list(&self) -> StoreResult<Vec<DocumentRecord>>;
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    original_name: String,
    #[sqlx(rename = "type")]
    doc_type: Option<String>,
    status: String,
    upload_time: String,
    result_pdf_path: Option<String>,
    result_json_path: Option<String>,
}

impl TryFrom<DocumentRow> for DocumentRecord {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<DocumentStatus>()
            .map_err(|source| StoreError::CorruptRecord {
                id: row.id.clone(),
                source,
            })?;

        Ok(DocumentRecord {
            id: row.id,
            original_name: row.original_name,
            doc_type: row.doc_type,
            status,
            upload_time: row.upload_time,
            result_pdf_path: row.result_pdf_path,
            result_json_path: row.result_json_path,
        })
    }
}

/// SQLite-backed document store
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, id: &str) -> StoreResult<Option<DocumentRecord>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, original_name, type, status, upload_time,
                   result_pdf_path, result_json_path
            FROM documents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRecord::try_from).transpose()
    }

    async fn create(&self, record: &DocumentRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, original_name, type, status, upload_time,
                                   result_pdf_path, result_json_path)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.original_name)
        .bind(&record.doc_type)
        .bind(record.status.as_str())
        .bind(&record.upload_time)
        .bind(&record.result_pdf_path)
        .bind(&record.result_json_path)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        update: &DocumentUpdate,
    ) -> StoreResult<Option<DocumentRecord>> {
        // One statement: the partial update and the row it produced
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents
            SET status = COALESCE(?, status),
                result_pdf_path = CASE WHEN ? THEN ? ELSE result_pdf_path END,
                result_json_path = CASE WHEN ? THEN ? ELSE result_json_path END
            WHERE id = ?
            RETURNING id, original_name, type, status, upload_time,
                      result_pdf_path, result_json_path
            "#,
        )
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.result_pdf_path.is_some())
        .bind(update.result_pdf_path.clone().flatten())
        .bind(update.result_json_path.is_some())
        .bind(update.result_json_path.clone().flatten())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRecord::try_from).transpose()
    }

    async fn list(&self) -> StoreResult<Vec<DocumentRecord>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, original_name, type, status, upload_time,
                   result_pdf_path, result_json_path
            FROM documents
            ORDER BY upload_time DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    async fn setup_store() -> SqliteDocumentStore {
        SqliteDocumentStore::new(create_memory_pool().await.unwrap())
    }

    fn record(id: &str, upload_time: &str) -> DocumentRecord {
        DocumentRecord::queued(id, "scan.pdf", Some("invoice".to_string()), upload_time)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = setup_store().await;
        store.create(&record("doc-1", "2026-01-01T00:00:00+00:00")).await.unwrap();

        let loaded = store.get("doc-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Queued);
        assert_eq!(loaded.doc_type.as_deref(), Some("invoice"));
        assert!(!loaded.has_pdf());
        assert!(!loaded.has_json());

        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_update_leaves_other_fields() {
        let store = setup_store().await;
        store.create(&record("doc-1", "2026-01-01T00:00:00+00:00")).await.unwrap();

        let update = DocumentUpdate::status(DocumentStatus::Ready)
            .with_results(Some("/r/doc-1.pdf".to_string()), Some("/r/doc-1.json".to_string()));
        store.update("doc-1", &update).await.unwrap().unwrap();

        // Status only: references survive
        let update = DocumentUpdate::status(DocumentStatus::Approved);
        let committed = store.update("doc-1", &update).await.unwrap().unwrap();

        let loaded = store.get("doc-1").await.unwrap().unwrap();
        assert_eq!(committed, loaded);
        assert_eq!(loaded.status, DocumentStatus::Approved);
        assert_eq!(loaded.result_pdf_path.as_deref(), Some("/r/doc-1.pdf"));
        assert_eq!(loaded.result_json_path.as_deref(), Some("/r/doc-1.json"));
        assert_eq!(loaded.doc_type.as_deref(), Some("invoice"));

        let update = DocumentUpdate::status(DocumentStatus::Error).clear_results();
        let committed = store.update("doc-1", &update).await.unwrap().unwrap();

        assert_eq!(committed, store.get("doc-1").await.unwrap().unwrap());
        assert_eq!(committed.status, DocumentStatus::Error);
        assert!(committed.result_pdf_path.is_none());
        assert!(committed.result_json_path.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = setup_store().await;
        let update = DocumentUpdate::status(DocumentStatus::Processing);
        assert!(store.update("missing", &update).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = setup_store().await;
        store.create(&record("old", "2026-01-01T00:00:00+00:00")).await.unwrap();
        store.create(&record("new", "2026-03-01T00:00:00+00:00")).await.unwrap();
        store.create(&record("mid", "2026-02-01T00:00:00+00:00")).await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_corrupt_status_is_reported() {
        let store = setup_store().await;
        sqlx::query(
            "INSERT INTO documents (id, original_name, status, upload_time) VALUES ('bad', 'x.pdf', 'archived', 'now')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.get("bad").await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptRecord { ref id, .. } if id == "bad"));
    }
}
