//! Configuration validation
//!
//! Runs the value checks of [`Config::validate`] and warns about settings that are legal
//! but unusual for a deployed service.

use anyhow::Result;
use courier_core::{Config, LogFormat, StorageBackend};

/// Validate critical configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() {
        if config.log_format() != LogFormat::Json {
            tracing::warn!("Production mode with non-JSON logs; set LOG_FORMAT=json for log shipping");
        }

        if config.storage_backend() == StorageBackend::Local {
            tracing::warn!(
                path = ?config.local_storage_path(),
                "Production mode with local storage backend"
            );
        }

        if config
            .s3_endpoint()
            .is_some_and(|endpoint| endpoint.starts_with("http://"))
        {
            tracing::warn!("S3 endpoint uses plain HTTP in production");
        }
    }

    if config.ingest_concurrency() > config.db_max_connections() as usize {
        tracing::warn!(
            ingest_concurrency = config.ingest_concurrency(),
            db_max_connections = config.db_max_connections(),
            "INGEST_CONCURRENCY exceeds the database pool size; record steps may wait for a connection"
        );
    }

    Ok(())
}
