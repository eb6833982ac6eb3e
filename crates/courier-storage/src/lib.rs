//! Courier Storage Library
//!
//! This crate provides the object storage abstraction used by the ingestion pipeline.
//! It includes the Storage trait and implementations for S3-compatible stores and the
//! local filesystem.
//!
//! # Storage key format
//!
//! Keys are `{kind}/{basename}` as produced by `courier_core::naming`. Every backend
//! writes with overwrite disabled: a second upload to an existing key fails with
//! [`StorageError::AlreadyExists`].
//!
//! Keys must not contain a `..` or `.` segment or a leading `/`. Key validation is
//! centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use courier_core::StorageBackend;
pub use factory::create_storage;
pub use keys::validate_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
