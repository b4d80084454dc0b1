//! Read and write the target document.
//!
//! The document is read once in full and written back in full. Writes go to a
//! temporary file next to the target which is then renamed over it, so a
//! failed write leaves the previous content in place.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::AppError;

/// Read the whole document as UTF-8.
pub fn read_document(path: &Path) -> Result<String, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read document '{}': {e}", path.display())))?;
    debug!(path = %path.display(), bytes = text.len(), "document read");
    Ok(text)
}

/// Replace the document's content with `text`.
pub fn write_document(path: &Path, text: &str) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        AppError::io(format!("Failed to create temporary file in '{}': {e}", dir.display()))
    })?;
    tmp.write_all(text.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| AppError::io(format!("Failed to write document '{}': {e}", path.display())))?;

    // Keep the original file's permissions.
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions()).map_err(|e| {
            AppError::io(format!("Failed to copy permissions for '{}': {e}", path.display()))
        })?;
    }

    tmp.persist(path)
        .map_err(|e| AppError::io(format!("Failed to replace document '{}': {e}", path.display())))?;
    debug!(path = %path.display(), bytes = text.len(), "document written");
    Ok(())
}
