//! Shared application state handed to every handler.

use crate::services::IngestionPipeline;
use courier_db::FileRecordStore;
use std::sync::Arc;

pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    /// Metadata store, also probed by the readiness check.
    pub records: Arc<dyn FileRecordStore>,
    /// Maximum number of messages of one delivery ingested at the same time.
    pub ingest_concurrency: usize,
}

impl AppState {
    pub fn new(
        pipeline: Arc<IngestionPipeline>,
        records: Arc<dyn FileRecordStore>,
        ingest_concurrency: usize,
    ) -> Self {
        Self {
            pipeline,
            records,
            ingest_concurrency: ingest_concurrency.max(1),
        }
    }
}
