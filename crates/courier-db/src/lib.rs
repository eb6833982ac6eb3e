//! Courier metadata store
//!
//! Repositories for the `file_records` table. The API crate depends on the
//! [`FileRecordStore`] trait so the pipeline can run against in-memory fakes.

pub mod db;

pub use db::{FileRecordRepository, FileRecordStore};
