//! File record repository: inserts into the `file_records` table.

use courier_core::models::{FileRecord, NewFileRecord};
use courier_core::AppError;
use sqlx::{PgPool, Postgres};

/// Metadata store operations used by the ingestion pipeline
#[async_trait::async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Insert one record describing an object that already exists in storage.
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError>;

    /// Cheap round-trip used by readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}

/// PostgreSQL implementation of [`FileRecordStore`]
#[derive(Clone)]
pub struct FileRecordRepository {
    pool: PgPool,
}

impl FileRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records pointing at a storage path, if any.
    #[tracing::instrument(skip(self), fields(db.table = "file_records"))]
    pub async fn find_by_storage_path(
        &self,
        storage_path: &str,
    ) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            SELECT id, original_name, storage_path, file_type, content_type,
                   size_bytes, message_id, created_at
            FROM file_records
            WHERE storage_path = $1
            "#,
        )
        .bind(storage_path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// All records created for a platform message, oldest first.
    ///
    /// Redelivered webhooks produce one record per delivery.
    #[tracing::instrument(skip(self), fields(db.table = "file_records"))]
    pub async fn list_by_message_id(&self, message_id: &str) -> Result<Vec<FileRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            SELECT id, original_name, storage_path, file_type, content_type,
                   size_bytes, message_id, created_at
            FROM file_records
            WHERE message_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait::async_trait]
impl FileRecordStore for FileRecordRepository {
    #[tracing::instrument(skip(self, record), fields(
        db.system = "postgresql",
        db.table = "file_records",
        db.operation = "insert",
        storage_path = %record.storage_path
    ))]
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        let row = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            INSERT INTO file_records (
                original_name, storage_path, file_type, content_type, size_bytes, message_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, original_name, storage_path, file_type, content_type,
                      size_bytes, message_id, created_at
            "#,
        )
        .bind(&record.original_name)
        .bind(&record.storage_path)
        .bind(record.file_type)
        .bind(&record.content_type)
        .bind(record.size_bytes)
        .bind(&record.message_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.system = "postgresql"))]
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Unavailable(format!("Metadata store unreachable: {}", e)))?;
        Ok(())
    }
}
