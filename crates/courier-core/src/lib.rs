//! Courier Core Library
//!
//! This crate provides the domain models, error types, configuration, and the pure
//! naming/classification rules shared by all Courier components.

pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod naming;
pub mod storage_types;

// Re-export commonly used types
pub use classify::{classify_content_type, ClassifiedType, MediaCategory};
pub use config::{BaseConfig, Config, IngestConfig, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use naming::{resolve_storage_path, sanitize_filename, ResolvedName};
pub use storage_types::StorageBackend;
