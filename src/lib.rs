//! # edgequake-md2pdf
//!
//! Convert Markdown documents to PDF through Pandoc and a LaTeX engine,
//! with Japanese (CJK) font defaults.
//!
//! ## Why this crate?
//!
//! Pandoc already renders Markdown to PDF well, but getting Japanese text
//! out of it means remembering the right engine, the right `CJKmainfont`
//! variables for whatever fonts happen to be installed, and sensible page
//! defaults. Failures are easy to misread too: Pandoc can exit zero without
//! writing a file, and a missing TeX engine looks like any other error.
//! This crate builds the command line deterministically, probes the
//! toolchain, and classifies every outcome into a small error taxonomy.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Input       validate input path, build a ConversionRequest
//!  ├─ 2. Probe       pandoc / engine --version (pre-flight, optional)
//!  ├─ 3. Fonts       fc-list :lang=ja → Noto CJK / IPA / fallback preset
//!  ├─ 4. Invocation  pure argv: engine, layout defaults, fonts, passthrough
//!  └─ 5. Run         spawn pandoc, verify a non-empty PDF, clean up on failure
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_md2pdf::{convert, ConversionConfig, ConversionRequest, Engine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = ConversionRequest::builder("report.md", "report.pdf")
//!         .engine(Engine::Xelatex)
//!         .options(["--toc"])
//!         .build()?;
//!     let report = convert(&request, &ConversionConfig::default()).await?;
//!     eprintln!("{} bytes, fonts: {:?}", report.output_bytes, report.fonts);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-md2pdf = { version = "0.2", default-features = false }
//! ```
//!
//! ## Choosing an Engine
//!
//! | Engine | Japanese support | Notes |
//! |--------|------------------|-------|
//! | `xelatex`  | xeCJK + system fonts | Default; most robust for Japanese |
//! | `lualatex` | LuaTeX-ja + system fonts | Slower, best typography |
//! | `pdflatex` | none | Latin-only documents; no font variables injected |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, Engine, FontPreset, FontSelection, LayoutDefaults,
    RequiredTool, ToolSet,
};
pub use convert::{
    check_dependencies, check_dependencies_with_runner, convert, convert_markdown, convert_sync,
    convert_with_runner, run_demo,
};
pub use error::{ErrorKind, Md2PdfError};
pub use output::{ConversionReport, DependencyReport, DependencyStatus};
pub use pipeline::invocation::{build_invocation, Invocation};
pub use pipeline::runner::{ExitState, ProcessOutcome, ProcessRunner, TokioProcessRunner};
pub use progress::{
    ConversionProgressCallback, ConversionState, NoopProgressCallback, ProgressCallback,
};
pub use request::{ConversionRequest, ConversionRequestBuilder};
