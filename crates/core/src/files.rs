//! Filename and path safety helpers for staged uploads and served files.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Name used when an uploaded file has no usable name.
pub const FALLBACK_DOCUMENT_NAME: &str = "document.pdf";

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]+").expect("valid filename regex"));

/// Make an uploaded filename safe to write inside a staging directory.
///
/// Runs of characters outside `[A-Za-z0-9_.-]` (path separators included)
/// collapse to a single `_`. Names that would still resolve outside the
/// directory (`.`, `..`) or are empty fall back to [`FALLBACK_DOCUMENT_NAME`].
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name.trim(), "_");
    match cleaned.as_ref() {
        "" | "." | ".." | "_" => FALLBACK_DOCUMENT_NAME.to_string(),
        other => other.to_string(),
    }
}

/// Whether a client-supplied relative path contains a parent-directory
/// segment, with either separator.
pub fn has_parent_segment(rel: &str) -> bool {
    rel.split(['/', '\\']).any(|segment| segment == "..")
}

/// Join a client-supplied relative path onto `base`.
///
/// Rejects empty paths, parent-directory segments and anything absolute or
/// drive-prefixed. Nothing is read from disk.
pub fn safe_join(base: &Path, rel: &str) -> Result<PathBuf, CoreError> {
    if rel.trim().is_empty() {
        return Err(CoreError::Validation("Empty file path".to_string()));
    }
    if has_parent_segment(rel) {
        return Err(CoreError::Validation("Invalid path".to_string()));
    }

    let mut joined = base.to_path_buf();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(CoreError::Validation("Invalid path".to_string()));
            }
        }
    }
    Ok(joined)
}

/// Guess a Content-Type from a file extension.
pub fn content_type_for_extension(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "txt" => "text/plain; charset=utf-8",
        "json" => "application/json",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
