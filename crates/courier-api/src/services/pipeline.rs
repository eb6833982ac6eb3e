//! Ingestion pipeline: fetch → classify → name → upload → record
//!
//! One invocation handles one media message. Steps run strictly in order; the first
//! failing step abandons the message and nothing is retried.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_core::models::{FileRecord, MediaMessage, NewFileRecord};
use courier_core::{classify_content_type, resolve_storage_path, AppError};
use courier_db::FileRecordStore;
use courier_storage::{Storage, StorageError};

use super::fetcher::{AttachmentSource, FetchError};

/// Last state a message reached in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Fetched,
    Classified,
    Named,
    Uploaded,
    Recorded,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Fetched => "fetched",
            IngestStage::Classified => "classified",
            IngestStage::Named => "named",
            IngestStage::Uploaded => "uploaded",
            IngestStage::Recorded => "recorded",
        }
    }
}

impl Display for IngestStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("object already exists at {0}")]
    UploadConflict(String),

    #[error("upload failed: {0}")]
    Upload(StorageError),

    #[error("record failed: {0}")]
    Record(AppError),

    #[error("step after '{stage}' timed out after {after:?}")]
    Timeout { stage: IngestStage, after: Duration },
}

impl IngestError {
    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Fetch(_) => "FETCH_FAILED",
            IngestError::UploadConflict(_) => "UPLOAD_CONFLICT",
            IngestError::Upload(_) => "UPLOAD_FAILED",
            IngestError::Record(_) => "RECORD_FAILED",
            IngestError::Timeout { .. } => "TIMEOUT",
        }
    }
}

impl From<StorageError> for IngestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(key) => IngestError::UploadConflict(key),
            other => IngestError::Upload(other),
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug)]
pub enum IngestOutcome {
    Recorded(FileRecord),
    Abandoned {
        stage: IngestStage,
        error: IngestError,
    },
}

impl IngestOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, IngestOutcome::Recorded(_))
    }
}

/// Per-step time limits.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTimeouts {
    pub fetch: Duration,
    pub storage: Duration,
    pub record: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            fetch: Duration::from_secs(20),
            storage: Duration::from_secs(60),
            record: Duration::from_secs(10),
        }
    }
}

async fn with_timeout<T, E, F>(
    limit: Duration,
    stage: IngestStage,
    step: F,
) -> Result<T, IngestError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<IngestError>,
{
    match tokio::time::timeout(limit, step).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(IngestError::Timeout {
            stage,
            after: limit,
        }),
    }
}

/// Orchestrates the ingestion of one message against injected clients.
pub struct IngestionPipeline {
    source: Arc<dyn AttachmentSource>,
    storage: Arc<dyn Storage>,
    records: Arc<dyn FileRecordStore>,
    timeouts: PipelineTimeouts,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn AttachmentSource>,
        storage: Arc<dyn Storage>,
        records: Arc<dyn FileRecordStore>,
        timeouts: PipelineTimeouts,
    ) -> Self {
        Self {
            source,
            storage,
            records,
            timeouts,
        }
    }

    /// Run the pipeline for one message. Never panics and never returns an error:
    /// failures are reported through [`IngestOutcome::Abandoned`].
    #[tracing::instrument(skip(self, message), fields(message_id = %message.id, kind = %message.kind))]
    pub async fn ingest(&self, message: &MediaMessage) -> IngestOutcome {
        let start = Instant::now();
        let mut stage = IngestStage::Received;

        match self.run(message, &mut stage).await {
            Ok(record) => {
                tracing::info!(
                    storage_path = %record.storage_path,
                    size_bytes = record.size_bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Message ingested"
                );
                IngestOutcome::Recorded(record)
            }
            Err(error) => {
                tracing::warn!(
                    stage = %stage,
                    code = error.code(),
                    error = %error,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Message abandoned"
                );
                IngestOutcome::Abandoned { stage, error }
            }
        }
    }

    async fn run(
        &self,
        message: &MediaMessage,
        stage: &mut IngestStage,
    ) -> Result<FileRecord, IngestError> {
        // A fetch timeout is a fetch failure, not a generic one.
        let content = match tokio::time::timeout(self.timeouts.fetch, self.source.fetch(&message.id))
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(IngestError::Fetch(FetchError::Timeout)),
        };
        *stage = IngestStage::Fetched;

        let classified = classify_content_type(content.content_type.as_deref());
        tracing::debug!(
            content_type = %classified.mime,
            extension = %classified.extension,
            category = ?classified.category,
            "Attachment classified"
        );
        *stage = IngestStage::Classified;

        let resolved = resolve_storage_path(
            message.kind,
            message.file_name.as_deref(),
            &classified.extension,
        );
        *stage = IngestStage::Named;

        let stored = with_timeout(
            self.timeouts.storage,
            *stage,
            self.storage
                .upload(&resolved.storage_path, content.bytes, &classified.mime),
        )
        .await?;
        *stage = IngestStage::Uploaded;

        let new_record = NewFileRecord {
            original_name: resolved.original_name,
            storage_path: stored.key.clone(),
            file_type: message.kind,
            content_type: classified.mime,
            size_bytes: i64::try_from(stored.size_bytes).unwrap_or(i64::MAX),
            message_id: Some(message.id.clone()),
        };

        let record = with_timeout(
            self.timeouts.record,
            *stage,
            async { self.records.insert(new_record).await.map_err(IngestError::Record) },
        )
        .await
        .inspect_err(|error| match error {
            // The dropped insert may still commit server-side.
            IngestError::Timeout { .. } => tracing::error!(
                bucket = %stored.bucket,
                storage_path = %stored.key,
                error = %error,
                "Metadata write timed out; stored object may be orphaned or recorded"
            ),
            _ => tracing::error!(
                bucket = %stored.bucket,
                storage_path = %stored.key,
                error = %error,
                "Stored object has no metadata record (orphaned)"
            ),
        })?;
        *stage = IngestStage::Recorded;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetcher::FetchedContent;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;
    use courier_core::models::{MessageKind, StoredObject};
    use courier_core::StorageBackend;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FixedSource {
        content_type: Option<&'static str>,
        body: &'static [u8],
        delay: Option<Duration>,
        fail_status: Option<u16>,
    }

    impl FixedSource {
        fn ok(content_type: &'static str, body: &'static [u8]) -> Self {
            Self {
                content_type: Some(content_type),
                body,
                delay: None,
                fail_status: None,
            }
        }
    }

    #[async_trait]
    impl AttachmentSource for FixedSource {
        async fn fetch(&self, _message_id: &str) -> Result<FetchedContent, FetchError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(status) = self.fail_status {
                return Err(FetchError::Status { status });
            }
            Ok(FetchedContent {
                bytes: Bytes::from_static(self.body),
                content_type: self.content_type.map(str::to_string),
            })
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        objects: Mutex<HashMap<String, Bytes>>,
        preexisting: bool,
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn upload(
            &self,
            storage_key: &str,
            data: Bytes,
            content_type: &str,
        ) -> courier_storage::StorageResult<StoredObject> {
            if self.preexisting {
                return Err(StorageError::AlreadyExists(storage_key.to_string()));
            }
            let size_bytes = data.len() as u64;
            self.objects
                .lock()
                .unwrap()
                .insert(storage_key.to_string(), data);
            Ok(StoredObject {
                backend: StorageBackend::Local,
                bucket: "line-files".to_string(),
                key: storage_key.to_string(),
                content_type: content_type.to_string(),
                size_bytes,
            })
        }

        async fn download(&self, storage_key: &str) -> courier_storage::StorageResult<Vec<u8>> {
            self.objects
                .lock()
                .unwrap()
                .get(storage_key)
                .map(|b| b.to_vec())
                .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
        }

        async fn exists(&self, storage_key: &str) -> courier_storage::StorageResult<bool> {
            Ok(self.objects.lock().unwrap().contains_key(storage_key))
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }

        fn bucket(&self) -> &str {
            "line-files"
        }
    }

    #[derive(Default)]
    struct MemoryRecords {
        rows: Mutex<Vec<FileRecord>>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl FileRecordStore for MemoryRecords {
        async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AppError::Unavailable("metadata store down".to_string()));
            }
            let row = FileRecord {
                id: Uuid::new_v4(),
                original_name: record.original_name,
                storage_path: record.storage_path,
                file_type: record.file_type,
                content_type: record.content_type,
                size_bytes: record.size_bytes,
                message_id: record.message_id,
                created_at: Utc::now(),
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn ping(&self) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn image_message() -> MediaMessage {
        MediaMessage {
            id: "m1".to_string(),
            kind: MessageKind::Image,
            file_name: None,
        }
    }

    fn pipeline(
        source: FixedSource,
        storage: Arc<dyn Storage>,
        records: Arc<MemoryRecords>,
    ) -> IngestionPipeline {
        IngestionPipeline::new(
            Arc::new(source),
            storage,
            records,
            PipelineTimeouts {
                fetch: Duration::from_millis(100),
                record: Duration::from_millis(100),
                ..PipelineTimeouts::default()
            },
        )
    }

    #[tokio::test]
    async fn image_without_filename_is_stored_and_recorded() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords::default());
        let outcome = pipeline(
            FixedSource::ok("image/jpeg", b"B"),
            storage.clone(),
            records.clone(),
        )
        .ingest(&image_message())
        .await;

        let record = match outcome {
            IngestOutcome::Recorded(record) => record,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert!(record.storage_path.starts_with("image/"));
        assert!(record.storage_path.ends_with(".jpg"));
        assert_eq!(
            record.original_name,
            record.storage_path.trim_start_matches("image/")
        );
        assert_eq!(record.file_type, MessageKind::Image);
        assert_eq!(record.content_type, "image/jpeg");
        assert_eq!(record.message_id.as_deref(), Some("m1"));
        assert_eq!(
            storage.download(&record.storage_path).await.unwrap(),
            b"B".to_vec()
        );
        assert_eq!(records.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_keeps_user_name_in_record() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords::default());
        let message = MediaMessage {
            id: "m2".to_string(),
            kind: MessageKind::File,
            file_name: Some("Report (final).pdf".to_string()),
        };

        let outcome = pipeline(
            FixedSource::ok("application/pdf", b"%PDF"),
            storage,
            records,
        )
        .ingest(&message)
        .await;

        let IngestOutcome::Recorded(record) = outcome else {
            panic!("expected a record");
        };
        assert!(record.storage_path.starts_with("file/Report__final__"));
        assert!(record.storage_path.ends_with(".pdf"));
        assert_eq!(record.original_name, "Report (final).pdf");
    }

    #[tokio::test]
    async fn fetch_status_failure_has_no_side_effects() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords::default());
        let source = FixedSource {
            fail_status: Some(404),
            ..FixedSource::ok("image/png", b"")
        };

        let outcome = pipeline(source, storage.clone(), records.clone())
            .ingest(&image_message())
            .await;

        match outcome {
            IngestOutcome::Abandoned { stage, error } => {
                assert_eq!(stage, IngestStage::Received);
                assert_eq!(error.code(), "FETCH_FAILED");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(storage.objects.lock().unwrap().is_empty());
        assert!(records.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_fetch_is_a_fetch_failure() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords::default());
        let source = FixedSource {
            delay: Some(Duration::from_secs(5)),
            ..FixedSource::ok("image/png", b"late")
        };

        let outcome = pipeline(source, storage.clone(), records.clone())
            .ingest(&image_message())
            .await;

        match outcome {
            IngestOutcome::Abandoned { error, .. } => {
                assert!(matches!(error, IngestError::Fetch(FetchError::Timeout)));
                assert_eq!(error.code(), "FETCH_FAILED");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(storage.objects.lock().unwrap().is_empty());
        assert!(records.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_conflict_writes_no_record() {
        let storage = Arc::new(MemoryStorage {
            preexisting: true,
            ..MemoryStorage::default()
        });
        let records = Arc::new(MemoryRecords::default());

        let outcome = pipeline(
            FixedSource::ok("image/png", b"png"),
            storage,
            records.clone(),
        )
        .ingest(&image_message())
        .await;

        match outcome {
            IngestOutcome::Abandoned { stage, error } => {
                assert_eq!(stage, IngestStage::Named);
                assert_eq!(error.code(), "UPLOAD_CONFLICT");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(records.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_failure_leaves_the_object_in_place() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords {
            fail: true,
            ..MemoryRecords::default()
        });

        let outcome = pipeline(
            FixedSource::ok("video/mp4", b"mp4"),
            storage.clone(),
            records,
        )
        .ingest(&MediaMessage {
            id: "v1".to_string(),
            kind: MessageKind::Video,
            file_name: None,
        })
        .await;

        match outcome {
            IngestOutcome::Abandoned { stage, error } => {
                assert_eq!(stage, IngestStage::Uploaded);
                assert_eq!(error.code(), "RECORD_FAILED");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let objects = storage.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects.keys().all(|k| k.starts_with("video/") && k.ends_with(".mp4")));
    }

    #[tokio::test]
    async fn missing_content_type_falls_back_to_bin() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords::default());
        let source = FixedSource {
            content_type: None,
            ..FixedSource::ok("", b"??")
        };

        let outcome = pipeline(source, storage, records)
            .ingest(&MediaMessage {
                id: "a1".to_string(),
                kind: MessageKind::Audio,
                file_name: None,
            })
            .await;

        let IngestOutcome::Recorded(record) = outcome else {
            panic!("expected a record");
        };
        assert!(record.storage_path.starts_with("audio/"));
        assert!(record.storage_path.ends_with(".bin"));
        assert_eq!(record.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn slow_record_write_times_out_after_upload() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords {
            delay: Some(Duration::from_secs(5)),
            ..MemoryRecords::default()
        });

        let outcome = pipeline(
            FixedSource::ok("image/png", b"png"),
            storage.clone(),
            records.clone(),
        )
        .ingest(&image_message())
        .await;

        match outcome {
            IngestOutcome::Abandoned { stage, error } => {
                assert_eq!(stage, IngestStage::Uploaded);
                assert_eq!(error.code(), "TIMEOUT");
                assert!(matches!(
                    error,
                    IngestError::Timeout {
                        stage: IngestStage::Uploaded,
                        ..
                    }
                ));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(storage.objects.lock().unwrap().len(), 1);
        assert!(records.rows.lock().unwrap().is_empty());
    }

    #[cfg(feature = "storage-local")]
    #[tokio::test]
    async fn dotted_file_names_are_stored_on_local_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            courier_storage::LocalStorage::new(dir.path(), "line-files".to_string())
                .await
                .unwrap(),
        );

        for (id, name, expected_prefix) in [
            ("f1", "my..notes.pdf", "file/my..notes_"),
            ("f2", "v1...final.pdf", "file/v1...final_"),
        ] {
            let records = Arc::new(MemoryRecords::default());
            let outcome = pipeline(
                FixedSource::ok("application/pdf", b"%PDF"),
                storage.clone(),
                records,
            )
            .ingest(&MediaMessage {
                id: id.to_string(),
                kind: MessageKind::File,
                file_name: Some(name.to_string()),
            })
            .await;

            let IngestOutcome::Recorded(record) = outcome else {
                panic!("expected {} to be recorded", name);
            };
            assert!(record.storage_path.starts_with(expected_prefix));
            assert!(record.storage_path.ends_with(".pdf"));
            assert_eq!(record.original_name, name);
            assert_eq!(
                storage.download(&record.storage_path).await.unwrap(),
                b"%PDF".to_vec()
            );
        }
    }
}
