//! Input resolution: validate the user-supplied Markdown and output paths.
//!
//! Runs before a [`crate::request::ConversionRequest`] exists, so an
//! invalid path is reported as an argument error and no subprocess is ever
//! spawned for it. Paths are returned exactly as given; nothing is
//! canonicalised.

use crate::error::Md2PdfError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` names an existing, readable regular file.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<PathBuf, Md2PdfError> {
    let path = path.as_ref().to_path_buf();

    if path.as_os_str().is_empty() {
        return Err(Md2PdfError::InvalidArgument(
            "input path must not be empty".into(),
        ));
    }

    let meta = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Md2PdfError::PermissionDenied { path });
        }
        Err(_) => return Err(Md2PdfError::InputNotFound { path }),
    };

    if !meta.is_file() {
        return Err(Md2PdfError::InputNotAFile { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Md2PdfError::PermissionDenied { path });
        }
        Err(_) => return Err(Md2PdfError::InputNotFound { path }),
    }

    debug!("Resolved Markdown input: {}", path.display());
    Ok(path)
}

/// Validate the declared output path.
///
/// The parent directory need not exist yet; the runner creates it.
pub fn resolve_output(path: impl AsRef<Path>) -> Result<PathBuf, Md2PdfError> {
    let path = path.as_ref().to_path_buf();

    if path.as_os_str().is_empty() {
        return Err(Md2PdfError::InvalidArgument(
            "output path must not be empty".into(),
        ));
    }
    if path.is_dir() {
        return Err(Md2PdfError::InvalidArgument(format!(
            "output path '{}' is a directory",
            path.display()
        )));
    }

    Ok(path)
}
