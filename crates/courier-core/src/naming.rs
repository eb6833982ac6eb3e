//! Storage path resolution.
//!
//! Every stored object lives at `{kind}/{basename}`. The basename always contains a
//! fresh random token, so two messages never resolve to the same path even when users
//! send files with identical names.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::models::MessageKind;

/// Maximum length, in characters, of a sanitized user filename.
pub const MAX_SANITIZED_CHARS: usize = 120;

/// Length of the random token (UUID v4, simple hex form).
pub const TOKEN_LEN: usize = 32;

/// Outcome of name resolution for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// `{kind}/{basename}`
    pub storage_path: String,
    pub basename: String,
    pub token: String,
    /// Name recorded in metadata: the user's filename, or the generated basename.
    pub original_name: String,
}

/// Sanitize a user-supplied filename.
///
/// NFKC-normalizes, replaces everything except alphanumerics, `.`, `_` and `-` with `_`,
/// strips leading/trailing dots and underscores, and truncates to
/// [`MAX_SANITIZED_CHARS`] characters. May return an empty string.
pub fn sanitize_filename(filename: &str) -> String {
    let replaced: String = filename
        .nfkc()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let truncated: String = trim_separators(&replaced)
        .chars()
        .take(MAX_SANITIZED_CHARS)
        .collect();

    trim_separators(&truncated).to_string()
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c| c == '.' || c == '_')
}

/// Split a sanitized name into stem and extension (extension keeps its dot).
///
/// The extension starts at the last dot, unless that dot is the first character.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx..])),
        _ => (name, None),
    }
}

fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Resolve the storage path for a message.
///
/// `classified_extension` must include its leading dot (see
/// [`classify_content_type`](crate::classify::classify_content_type)).
pub fn resolve_storage_path(
    kind: MessageKind,
    original_filename: Option<&str>,
    classified_extension: &str,
) -> ResolvedName {
    resolve_with_token(kind, original_filename, classified_extension, generate_token())
}

fn resolve_with_token(
    kind: MessageKind,
    original_filename: Option<&str>,
    classified_extension: &str,
    token: String,
) -> ResolvedName {
    let user_name = original_filename.filter(|name| !name.trim().is_empty());

    let basename = match user_name {
        None => format!("{}{}", token, classified_extension),
        Some(name) => {
            let sanitized = sanitize_filename(name);
            let (stem, extension) = split_extension(&sanitized);
            let extension = extension.unwrap_or(classified_extension);
            if stem.is_empty() {
                format!("{}{}", token, extension)
            } else {
                format!("{}_{}{}", stem, token, extension)
            }
        }
    };

    let original_name = user_name
        .map(str::to_string)
        .unwrap_or_else(|| basename.clone());

    ResolvedName {
        storage_path: format!("{}/{}", kind.as_str(), basename),
        basename,
        token,
        original_name,
    }
}
