//! Test helpers: in-memory storage and metadata store, and an app wired to a mock
//! content API.
//!
//! Run from workspace root: `cargo test -p courier-api`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use bytes::Bytes;
use chrono::Utc;
use courier_api::services::{IngestionPipeline, LineContentClient, PipelineTimeouts};
use courier_api::setup::routes::build_router;
use courier_api::state::AppState;
use courier_core::models::{FileRecord, NewFileRecord, StoredObject};
use courier_core::{AppError, StorageBackend};
use courier_db::FileRecordStore;
use courier_storage::{validate_key, Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const TEST_TOKEN: &str = "test-channel-token";
pub const TEST_BUCKET: &str = "line-files";

/// Object store kept in memory. Refuses overwrites like the real backends.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    fail_uploads: Mutex<bool>,
    taken_prefixes: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn fail_uploads(&self) {
        *self.fail_uploads.lock().unwrap() = true;
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, content_type)| content_type.clone())
    }

    /// Treat every key under `prefix` as already taken, so uploads there conflict.
    pub fn take_prefix(&self, prefix: &str) {
        self.taken_prefixes.lock().unwrap().push(prefix.to_string());
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        validate_key(storage_key)?;
        if *self.fail_uploads.lock().unwrap() {
            return Err(StorageError::UploadFailed("permission denied".to_string()));
        }
        let taken = self
            .taken_prefixes
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| storage_key.starts_with(prefix.as_str()));
        if taken {
            return Err(StorageError::AlreadyExists(storage_key.to_string()));
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(storage_key) {
            return Err(StorageError::AlreadyExists(storage_key.to_string()));
        }
        let size_bytes = data.len() as u64;
        objects.insert(storage_key.to_string(), (data, content_type.to_string()));
        Ok(StoredObject {
            backend: StorageBackend::Local,
            bucket: TEST_BUCKET.to_string(),
            key: storage_key.to_string(),
            content_type: content_type.to_string(),
            size_bytes,
        })
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .map(|(data, _)| data.to_vec())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    fn bucket(&self) -> &str {
        TEST_BUCKET
    }
}

/// Metadata store kept in memory, with switchable failures.
#[derive(Default)]
pub struct MemoryRecords {
    rows: Mutex<Vec<FileRecord>>,
    fail_inserts: Mutex<bool>,
    fail_ping: Mutex<bool>,
}

impl MemoryRecords {
    pub fn fail_inserts(&self) {
        *self.fail_inserts.lock().unwrap() = true;
    }

    pub fn fail_ping(&self) {
        *self.fail_ping.lock().unwrap() = true;
    }

    pub fn rows(&self) -> Vec<FileRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileRecordStore for MemoryRecords {
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        if *self.fail_inserts.lock().unwrap() {
            return Err(AppError::Unavailable("metadata store unreachable".to_string()));
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
        if *self.fail_ping.lock().unwrap() {
            return Err(AppError::Unavailable("metadata store unreachable".to_string()));
        }
        Ok(())
    }
}

/// Test application: HTTP server, mock content API and inspectable collaborators.
pub struct TestApp {
    pub server: TestServer,
    /// The same router `server` wraps, for driving requests directly.
    pub router: Router,
    pub content_api: mockito::ServerGuard,
    pub storage: Arc<MemoryStorage>,
    pub records: Arc<MemoryRecords>,
}

impl TestApp {
    /// Register a content response for `message_id`.
    pub async fn serve_content(
        &mut self,
        message_id: &str,
        content_type: &str,
        body: &[u8],
    ) -> mockito::Mock {
        self.content_api
            .mock("GET", format!("/v2/bot/message/{}/content", message_id).as_str())
            .match_header("authorization", format!("Bearer {}", TEST_TOKEN).as_str())
            .with_status(200)
            .with_header("content-type", content_type)
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn serve_status(&mut self, message_id: &str, status: usize) -> mockito::Mock {
        self.content_api
            .mock("GET", format!("/v2/bot/message/{}/content", message_id).as_str())
            .with_status(status)
            .create_async()
            .await
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_fetch_timeout(Duration::from_secs(5)).await
}

pub async fn setup_test_app_with_fetch_timeout(fetch_timeout: Duration) -> TestApp {
    let content_api = mockito::Server::new_async().await;
    let storage = Arc::new(MemoryStorage::default());
    let records = Arc::new(MemoryRecords::default());

    let timeouts = PipelineTimeouts {
        fetch: fetch_timeout,
        ..PipelineTimeouts::default()
    };
    let source = LineContentClient::new(content_api.url(), TEST_TOKEN, fetch_timeout)
        .expect("Failed to create content client");
    let pipeline = IngestionPipeline::new(
        Arc::new(source),
        storage.clone(),
        records.clone(),
        timeouts,
    );
    let state = Arc::new(AppState::new(Arc::new(pipeline), records.clone(), 4));

    let router = build_router(state, 1024 * 1024);
    let server = TestServer::new(router.clone()).expect("Failed to start test server");

    TestApp {
        server,
        router,
        content_api,
        storage,
        records,
    }
}
