//! Configuration module
//!
//! This module provides configuration structures for the ingestion service,
//! including server, database, content API, storage and pipeline settings.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

// Common constants
const DEFAULT_PORT: u16 = 5000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONTENT_API_BASE: &str = "https://api-data.line.me";
const DEFAULT_BUCKET: &str = "line-files";
const FETCH_TIMEOUT_SECS: u64 = 20;
const STORAGE_TIMEOUT_SECS: u64 = 60;
const RECORD_TIMEOUT_SECS: u64 = 10;
const INGEST_CONCURRENCY: usize = 4;
const WEBHOOK_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    pub log_format: LogFormat,
}

/// Ingestion service configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Content API
    pub line_channel_access_token: String,
    pub content_api_base: String,
    pub fetch_timeout_secs: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub storage_bucket: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, Supabase, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub storage_timeout_secs: u64,
    // Pipeline
    pub record_timeout_secs: u64,
    pub ingest_concurrency: usize,
    pub webhook_body_limit_bytes: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<IngestConfig>);

impl Config {
    fn as_ingest(&self) -> &IngestConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_ingest().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = IngestConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_ingest().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_ingest().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_ingest().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_ingest().base.log_format
    }

    pub fn database_url(&self) -> &str {
        &self.as_ingest().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_ingest().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_ingest().base.db_timeout_seconds
    }

    pub fn line_channel_access_token(&self) -> &str {
        &self.as_ingest().line_channel_access_token
    }

    pub fn content_api_base(&self) -> &str {
        &self.as_ingest().content_api_base
    }

    pub fn fetch_timeout_secs(&self) -> u64 {
        self.as_ingest().fetch_timeout_secs
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_ingest().storage_backend
    }

    pub fn storage_bucket(&self) -> &str {
        &self.as_ingest().storage_bucket
    }

    /// S3 region, preferring `S3_REGION` over `AWS_REGION`.
    pub fn s3_region(&self) -> Option<&str> {
        self.as_ingest()
            .s3_region
            .as_deref()
            .or(self.as_ingest().aws_region.as_deref())
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_ingest().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_ingest().local_storage_path.as_deref()
    }

    pub fn storage_timeout_secs(&self) -> u64 {
        self.as_ingest().storage_timeout_secs
    }

    pub fn record_timeout_secs(&self) -> u64 {
        self.as_ingest().record_timeout_secs
    }

    pub fn ingest_concurrency(&self) -> usize {
        self.as_ingest().ingest_concurrency
    }

    pub fn webhook_body_limit_bytes(&self) -> usize {
        self.as_ingest().webhook_body_limit_bytes
    }
}

/// Parse an optional numeric variable. Unset means `default`; anything unparsable is an error.
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source, then validate it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_PORT,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(format) => format.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            None => LogFormat::default(),
        };

        let base = BaseConfig {
            server_port,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", MAX_CONNECTIONS)?,
            db_timeout_seconds: parse_or(
                &lookup,
                "DB_TIMEOUT_SECONDS",
                CONNECTION_TIMEOUT_SECS,
            )?,
            environment,
            log_format,
        };

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(backend) => backend.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let config = IngestConfig {
            base,
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            line_channel_access_token: lookup("LINE_CHANNEL_ACCESS_TOKEN").ok_or_else(|| {
                anyhow::anyhow!("LINE_CHANNEL_ACCESS_TOKEN must be set to fetch message content")
            })?,
            content_api_base: non_empty(lookup("LINE_CONTENT_API_BASE"))
                .unwrap_or_else(|| DEFAULT_CONTENT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            fetch_timeout_secs: parse_or(&lookup, "FETCH_TIMEOUT_SECS", FETCH_TIMEOUT_SECS)?,
            storage_backend,
            storage_bucket: non_empty(lookup("STORAGE_BUCKET"))
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            s3_region: non_empty(lookup("S3_REGION")),
            s3_endpoint: non_empty(lookup("S3_ENDPOINT")),
            aws_region: non_empty(lookup("AWS_REGION")),
            local_storage_path: non_empty(lookup("LOCAL_STORAGE_PATH")),
            storage_timeout_secs: parse_or(&lookup, "STORAGE_TIMEOUT_SECS", STORAGE_TIMEOUT_SECS)?,
            record_timeout_secs: parse_or(&lookup, "RECORD_TIMEOUT_SECS", RECORD_TIMEOUT_SECS)?,
            ingest_concurrency: parse_or(&lookup, "INGEST_CONCURRENCY", INGEST_CONCURRENCY)?.max(1),
            webhook_body_limit_bytes: parse_or(
                &lookup,
                "WEBHOOK_BODY_LIMIT_BYTES",
                WEBHOOK_BODY_LIMIT_BYTES,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.line_channel_access_token.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "LINE_CHANNEL_ACCESS_TOKEN must not be empty"
            ));
        }

        if !self.content_api_base.starts_with("http://")
            && !self.content_api_base.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "LINE_CONTENT_API_BASE must be an http(s) URL"
            ));
        }

        if self.fetch_timeout_secs == 0
            || self.storage_timeout_secs == 0
            || self.record_timeout_secs == 0
        {
            return Err(anyhow::anyhow!(
                "FETCH_TIMEOUT_SECS, STORAGE_TIMEOUT_SECS and RECORD_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.webhook_body_limit_bytes == 0 {
            return Err(anyhow::anyhow!(
                "WEBHOOK_BODY_LIMIT_BYTES must be greater than zero"
            ));
        }

        // Validate storage backend configuration
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
