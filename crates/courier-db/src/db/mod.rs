//! Database repositories for data access layer
//
// File metadata written by the ingestion pipeline
pub mod file_record;

pub use file_record::{FileRecordRepository, FileRecordStore};
