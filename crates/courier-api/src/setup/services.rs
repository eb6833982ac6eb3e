//! Service initialization and application state setup

use crate::services::{IngestionPipeline, LineContentClient, PipelineTimeouts};
use crate::state::AppState;
use anyhow::{Context, Result};
use courier_core::Config;
use courier_db::{FileRecordRepository, FileRecordStore};
use courier_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Build the long-lived clients and the pipeline, returning the application state
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let timeouts = PipelineTimeouts {
        fetch: Duration::from_secs(config.fetch_timeout_secs()),
        storage: Duration::from_secs(config.storage_timeout_secs()),
        record: Duration::from_secs(config.record_timeout_secs()),
    };

    let source = LineContentClient::new(
        config.content_api_base(),
        config.line_channel_access_token(),
        timeouts.fetch,
    )
    .context("Failed to create content API client")?;

    let records: Arc<dyn FileRecordStore> = Arc::new(FileRecordRepository::new(pool));

    let pipeline = IngestionPipeline::new(Arc::new(source), storage, records.clone(), timeouts);

    tracing::info!(
        content_api_base = %config.content_api_base(),
        fetch_timeout_secs = config.fetch_timeout_secs(),
        storage_timeout_secs = config.storage_timeout_secs(),
        record_timeout_secs = config.record_timeout_secs(),
        ingest_concurrency = config.ingest_concurrency(),
        "Ingestion pipeline initialized"
    );

    Ok(Arc::new(AppState::new(
        Arc::new(pipeline),
        records,
        config.ingest_concurrency(),
    )))
}
