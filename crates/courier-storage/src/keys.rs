//! Shared key validation for storage backends.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could escape the bucket or address a directory.
///
/// All backends must call this before touching the store.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.ends_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key must name an object: '{}'",
            storage_key
        )));
    }

    let traverses = storage_key.split('/').any(|segment| segment == ".." || segment == ".");
    if traverses || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }

    Ok(())
}
