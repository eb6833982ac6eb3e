//! Stored object model: where the bytes of one ingested attachment live.

use serde::{Deserialize, Serialize};

use crate::storage_types::StorageBackend;

/// Bytes written exactly once at `key` inside `bucket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub backend: StorageBackend,
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub size_bytes: u64,
}
