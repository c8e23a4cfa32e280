//! Error types for the edgequake-md2pdf library.
//!
//! Every failure a conversion can end in is a variant of [`Md2PdfError`].
//! The variants group into a small taxonomy, exposed as [`ErrorKind`]:
//!
//! * **InvalidArgument** — bad input path, unknown engine, invalid config.
//!   Raised before any subprocess is spawned.
//! * **MissingDependency** — Pandoc or the selected TeX engine is not
//!   reachable. Kept apart from other failures so callers can suggest an
//!   installation command.
//! * **ConversionFailed** — the converter exited non-zero; its standard
//!   error is carried verbatim.
//! * **OutputNotProduced** — the converter exited zero but the declared
//!   output file is missing or empty.
//! * **Timeout** — the converter did not exit within the configured limit.
//!
//! The CLI maps each kind to a distinct process exit code via
//! [`Md2PdfError::exit_code`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-md2pdf library.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// The input path exists but is a directory (or another non-file).
    #[error("Input '{path}' is not a regular file")]
    InputNotAFile { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The engine name is not one of xelatex, pdflatex, lualatex.
    #[error("Unknown PDF engine '{name}'\nSupported engines: xelatex (default), pdflatex, lualatex.")]
    UnknownEngine { name: String },

    /// An argument was syntactically invalid (empty output path, …).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Dependency errors ─────────────────────────────────────────────────
    /// A required external tool could not be found or started.
    #[error("Required tool '{tool}' was not found.\n{hint}")]
    MissingDependency { tool: String, hint: String },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The converter ran and exited with a non-zero status.
    ///
    /// `code` is `None` when the process was terminated by a signal.
    #[error("{}", conversion_failed_message(.code, .stderr, .hint))]
    ConversionFailed {
        code: Option<i32>,
        stderr: String,
        hint: Option<String>,
    },

    /// The converter exited successfully but wrote nothing usable.
    ///
    /// `empty` distinguishes a zero-byte file from one that was never
    /// written (absent, or left untouched from an earlier run).
    #[error("Converter exited successfully but produced no usable output: '{path}' {}", output_state(.empty))]
    OutputNotProduced { path: PathBuf, empty: bool },

    /// The converter did not exit in time and was killed.
    #[error("Conversion timed out after {secs}s and was terminated\nIncrease --timeout or simplify the document.")]
    Timeout { secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory or write a generated file.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Spawning the converter failed for a reason other than "not found".
    #[error("Failed to start '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn conversion_failed_message(code: &Option<i32>, stderr: &str, hint: &Option<String>) -> String {
    let mut msg = match code {
        Some(c) => format!("Conversion failed (exit code {c})"),
        None => "Conversion failed (converter was terminated by a signal)".to_string(),
    };
    let stderr = stderr.trim_end();
    if !stderr.is_empty() {
        msg.push_str(":\n");
        msg.push_str(stderr);
    }
    if let Some(h) = hint {
        msg.push_str("\n\n");
        msg.push_str(h);
    }
    msg
}

fn output_state(empty: &bool) -> &'static str {
    if *empty {
        "is empty"
    } else {
        "was not written"
    }
}

/// The category an [`Md2PdfError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    MissingDependency,
    ConversionFailed,
    OutputNotProduced,
    Timeout,
    Internal,
}

impl ErrorKind {
    /// Process exit code the CLI uses for this category.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::InvalidArgument => 2,
            ErrorKind::MissingDependency => 3,
            ErrorKind::ConversionFailed => 4,
            ErrorKind::OutputNotProduced => 5,
            ErrorKind::Timeout => 6,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::MissingDependency => "missing dependency",
            ErrorKind::ConversionFailed => "conversion failed",
            ErrorKind::OutputNotProduced => "output not produced",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

impl Md2PdfError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Md2PdfError::InputNotFound { .. }
            | Md2PdfError::InputNotAFile { .. }
            | Md2PdfError::PermissionDenied { .. }
            | Md2PdfError::UnknownEngine { .. }
            | Md2PdfError::InvalidArgument(_)
            | Md2PdfError::InvalidConfig(_) => ErrorKind::InvalidArgument,
            Md2PdfError::MissingDependency { .. } => ErrorKind::MissingDependency,
            Md2PdfError::ConversionFailed { .. } => ErrorKind::ConversionFailed,
            Md2PdfError::OutputNotProduced { .. } => ErrorKind::OutputNotProduced,
            Md2PdfError::Timeout { .. } => ErrorKind::Timeout,
            Md2PdfError::WriteFailed { .. }
            | Md2PdfError::SpawnFailed { .. }
            | Md2PdfError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind().exit_code()`.
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}
