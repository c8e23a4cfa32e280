//! Built-in Japanese sample document for `--demo`.

use crate::error::Md2PdfError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Markdown exercising headings, lists, a table, code, math and a quote,
/// with mixed Japanese and Latin text.
pub const DEMO_MARKDOWN: &str = include_str!("../../assets/demo.md");

/// File stem used for the demo input and output.
pub const DEMO_STEM: &str = "japanese_demo";

/// Paths of a written demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoFiles {
    pub markdown: PathBuf,
    pub pdf: PathBuf,
}

/// Write the sample Markdown into `dir` (created if needed).
pub fn write_demo(dir: impl AsRef<Path>) -> Result<DemoFiles, Md2PdfError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| Md2PdfError::WriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let markdown = dir.join(format!("{DEMO_STEM}.md"));
    std::fs::write(&markdown, DEMO_MARKDOWN).map_err(|e| Md2PdfError::WriteFailed {
        path: markdown.clone(),
        source: e,
    })?;
    info!("Wrote demo document: {}", markdown.display());

    Ok(DemoFiles {
        pdf: dir.join(format!("{DEMO_STEM}.pdf")),
        markdown,
    })
}
