//! Content-type classification.
//!
//! Maps a declared MIME type to the file extension used for storage and to a coarse
//! category. Classification is total: unknown or empty input resolves to `.bin`.

use serde::Serialize;

/// MIME type assumed when the platform declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Extension used when no other resolution succeeds.
pub const FALLBACK_EXTENSION: &str = ".bin";

/// Well-known content types, checked in order before the generic MIME database.
const KNOWN_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/heic", ".heic"),
    ("image/heif", ".heif"),
    ("video/mp4", ".mp4"),
    ("video/quicktime", ".mov"),
    ("video/3gpp", ".3gp"),
    ("video/webm", ".webm"),
    ("audio/mpeg", ".mp3"),
    ("audio/mp4", ".m4a"),
    ("audio/x-m4a", ".m4a"),
    ("audio/aac", ".aac"),
    ("audio/wav", ".wav"),
    ("audio/x-wav", ".wav"),
    ("audio/ogg", ".ogg"),
    ("application/pdf", ".pdf"),
    ("application/zip", ".zip"),
    ("application/msword", ".doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    ("application/vnd.ms-excel", ".xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    ("text/plain", ".txt"),
    ("text/csv", ".csv"),
    ("application/json", ".json"),
    ("application/octet-stream", ".bin"),
];

/// Coarse category derived from the top-level MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

/// Result of classifying a declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedType {
    /// Normalized MIME type (lowercase, no parameters).
    pub mime: String,
    /// Extension including the leading dot, never empty.
    pub extension: String,
    pub category: MediaCategory,
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    if essence.is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        essence.to_lowercase()
    }
}

/// Classify an optional declared content type.
pub fn classify_content_type(content_type: Option<&str>) -> ClassifiedType {
    let mime = normalize_mime_type(content_type.unwrap_or(DEFAULT_CONTENT_TYPE));
    let extension = extension_for(&mime);
    let category = category_for(&mime);

    ClassifiedType {
        mime,
        extension,
        category,
    }
}

fn extension_for(mime: &str) -> String {
    if let Some((_, ext)) = KNOWN_EXTENSIONS.iter().find(|(known, _)| *known == mime) {
        return (*ext).to_string();
    }

    mime_guess::get_mime_extensions_str(mime)
        .and_then(|exts| exts.first())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

fn category_for(mime: &str) -> MediaCategory {
    match mime.split('/').next().unwrap_or("") {
        "image" => MediaCategory::Image,
        "video" => MediaCategory::Video,
        "audio" => MediaCategory::Audio,
        "text" => MediaCategory::Document,
        _ if mime == "application/pdf" || mime.starts_with("application/vnd.") => {
            MediaCategory::Document
        }
        _ => MediaCategory::Other,
    }
}
