//! Metadata rows describing stored objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::message::MessageKind;

/// Durable record for one stored object, written only after the object exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: Uuid,
    pub original_name: String,
    pub storage_path: String,
    pub file_type: MessageKind,
    pub content_type: String,
    pub size_bytes: i64,
    /// Platform message identifier. Not unique: redeliveries produce a second record.
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values supplied by the pipeline when recording a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRecord {
    pub original_name: String,
    pub storage_path: String,
    pub file_type: MessageKind,
    pub content_type: String,
    pub size_bytes: i64,
    pub message_id: Option<String>,
}
