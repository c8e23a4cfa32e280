//! The per-document conversion request.

use crate::config::Engine;
use crate::error::Md2PdfError;
use crate::pipeline::input;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One validated Markdown → PDF job.
///
/// Only constructible through [`ConversionRequest::new`] (or its builder),
/// which checks the input before returning; fields are read-only after
/// that. The engine is a typed [`Engine`], so an unknown engine name is
/// rejected when it is parsed, before a request can exist.
///
/// # Example
/// ```rust,no_run
/// use edgequake_md2pdf::{ConversionRequest, Engine};
///
/// let request = ConversionRequest::builder("notes.md", "out/notes.pdf")
///     .engine(Engine::Lualatex)
///     .options(["--toc", "--number-sections"])
///     .build()?;
/// assert_eq!(request.options(), ["--toc", "--number-sections"]);
/// # Ok::<(), edgequake_md2pdf::Md2PdfError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRequest {
    input: PathBuf,
    output: PathBuf,
    engine: Engine,
    options: Vec<String>,
    verbose: bool,
}

impl ConversionRequest {
    /// Validate `input` and `output` and build a request with defaults:
    /// engine [`Engine::Xelatex`], no passthrough options, not verbose.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Self, Md2PdfError> {
        Self::builder(input, output).build()
    }

    pub fn builder(input: impl AsRef<Path>, output: impl AsRef<Path>) -> ConversionRequestBuilder {
        ConversionRequestBuilder {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            engine: Engine::default(),
            options: Vec::new(),
            verbose: false,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Passthrough options, in the order supplied.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

/// Builder for [`ConversionRequest`]; validation happens in [`build`](Self::build).
#[derive(Debug)]
pub struct ConversionRequestBuilder {
    input: PathBuf,
    output: PathBuf,
    engine: Engine,
    options: Vec<String>,
    verbose: bool,
}

impl ConversionRequestBuilder {
    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Append passthrough options. They are forwarded verbatim.
    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }

    /// Validate the paths and build the request.
    ///
    /// # Errors
    /// An [`crate::ErrorKind::InvalidArgument`] error when the input is
    /// missing, unreadable or not a file, or the output path is empty or
    /// a directory.
    pub fn build(self) -> Result<ConversionRequest, Md2PdfError> {
        let input = input::resolve_input(&self.input)?;
        let output = input::resolve_output(&self.output)?;
        Ok(ConversionRequest {
            input,
            output,
            engine: self.engine,
            options: self.options,
            verbose: self.verbose,
        })
    }
}
