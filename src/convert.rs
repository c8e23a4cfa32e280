//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline for one request with real child
//! processes. [`convert_with_runner`] is the same pipeline over any
//! [`ProcessRunner`], which is how the tests drive it with scripted fakes.

use crate::config::{ConversionConfig, Engine, FC_LIST};
use crate::error::Md2PdfError;
use crate::output::{ConversionReport, DependencyReport};
use crate::pipeline::runner::{self, ProcessRunner, TokioProcessRunner};
use crate::pipeline::{demo, fonts, invocation, probe};
use crate::progress::ConversionState;
use crate::request::ConversionRequest;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound for a single `--version` or `fc-list` query.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Convert one Markdown file to PDF.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// A [`ConversionReport`] once the converter exited zero and the output
/// file exists and is non-empty.
///
/// # Errors
/// - [`Md2PdfError::MissingDependency`] when Pandoc or the engine is absent
/// - [`Md2PdfError::ConversionFailed`] when Pandoc exits non-zero (stderr attached)
/// - [`Md2PdfError::OutputNotProduced`] when Pandoc exits zero without a PDF
/// - [`Md2PdfError::Timeout`] when `config.timeout_secs` elapses
///
/// # Example
/// ```rust,no_run
/// use edgequake_md2pdf::{convert, ConversionConfig, ConversionRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = ConversionRequest::new("notes.md", "notes.pdf")?;
/// let report = convert(&request, &ConversionConfig::default()).await?;
/// println!("{} bytes in {}ms", report.output_bytes, report.duration_ms);
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionReport, Md2PdfError> {
    let probe_runner = TokioProcessRunner::new().with_timeout(Some(PROBE_TIMEOUT));
    let runner = TokioProcessRunner::new().with_timeout(config.timeout());
    run_pipeline(request, config, &probe_runner, &runner).await
}

/// [`convert`] over a caller-supplied process runner.
///
/// The same runner serves the pre-flight probes, font detection and the
/// conversion itself.
pub async fn convert_with_runner<R: ProcessRunner>(
    request: &ConversionRequest,
    config: &ConversionConfig,
    runner: &R,
) -> Result<ConversionReport, Md2PdfError> {
    run_pipeline(request, config, runner, runner).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionReport, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(request, config))
}

/// Convert a Markdown string to PDF.
///
/// The text is written to a managed [`tempfile`] with an `.md` suffix,
/// which is removed again when this function returns.
///
/// # Example
/// ```rust,no_run
/// use edgequake_md2pdf::{convert_markdown, ConversionConfig, Engine};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let md = "# 見出し\n\n本文です。\n";
/// convert_markdown(md, "out/hello.pdf", Engine::Xelatex, &ConversionConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn convert_markdown(
    markdown: &str,
    output: impl AsRef<Path>,
    engine: Engine,
    config: &ConversionConfig,
) -> Result<ConversionReport, Md2PdfError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("md2pdf-")
        .suffix(".md")
        .tempfile()
        .map_err(|e| Md2PdfError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(markdown.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| Md2PdfError::Internal(format!("tempfile write: {e}")))?;

    let request = ConversionRequest::builder(tmp.path(), output.as_ref())
        .engine(engine)
        .build()?;
    // `tmp` is dropped (and the file deleted) after `convert` returns
    convert(&request, config).await
}

/// Probe every tool a conversion with `engine` needs, plus Japanese fonts.
///
/// Never fails for a missing tool; inspect
/// [`DependencyReport::is_satisfied`] instead.
pub async fn check_dependencies(engine: Engine, config: &ConversionConfig) -> DependencyReport {
    let runner = TokioProcessRunner::new().with_timeout(Some(PROBE_TIMEOUT));
    check_dependencies_with_runner(engine, config, &runner).await
}

/// [`check_dependencies`] over a caller-supplied process runner.
pub async fn check_dependencies_with_runner<R: ProcessRunner>(
    engine: Engine,
    config: &ConversionConfig,
    runner: &R,
) -> DependencyReport {
    let tools = config.tool_set(engine);
    let statuses = probe::probe_dependencies(runner, &tools, config.progress_callback.as_ref()).await;

    let fc_list_found = statuses.iter().any(|s| s.name == FC_LIST && s.found);
    let detected = if fc_list_found {
        fonts::detect_fonts(runner).await
    } else {
        None
    };

    DependencyReport {
        tools: statuses,
        fonts: detected,
    }
}

/// Write the bundled Japanese sample into `dir` and convert it.
///
/// The PDF lands next to the Markdown as `japanese_demo.pdf`.
pub async fn run_demo(
    dir: impl AsRef<Path>,
    engine: Engine,
    options: &[String],
    verbose: bool,
    config: &ConversionConfig,
) -> Result<ConversionReport, Md2PdfError> {
    let files = demo::write_demo(dir)?;
    let request = ConversionRequest::builder(&files.markdown, &files.pdf)
        .engine(engine)
        .options(options.iter().cloned())
        .verbose(verbose)
        .build()?;
    convert(&request, config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_pipeline<P: ProcessRunner, R: ProcessRunner>(
    request: &ConversionRequest,
    config: &ConversionConfig,
    probe_runner: &P,
    runner: &R,
) -> Result<ConversionReport, Md2PdfError> {
    let progress = config.progress_callback.as_ref();
    if let Some(cb) = progress {
        cb.on_state_change(ConversionState::NotStarted);
    }
    info!(
        "Converting {} → {} with {}",
        request.input().display(),
        request.output().display(),
        request.engine()
    );

    // ── Step 1: Pre-flight ───────────────────────────────────────────────
    if config.preflight {
        if let Err(e) = preflight(request.engine(), config, probe_runner).await {
            if let Some(cb) = progress {
                cb.on_state_change(ConversionState::Failed);
            }
            return Err(e);
        }
    }

    // ── Step 2: Fonts ────────────────────────────────────────────────────
    let preset = fonts::resolve_fonts(config.fonts, request.engine(), probe_runner).await;

    // ── Step 3: Build invocation ─────────────────────────────────────────
    let invocation = invocation::build_invocation(request, config, preset);
    let command = invocation.display();
    if request.verbose() {
        info!("Running: {command}");
    } else {
        debug!("Running: {command}");
    }
    if let Some(cb) = progress {
        cb.on_invocation(&command);
    }

    // ── Step 4: Run and verify ───────────────────────────────────────────
    let run = runner::run_conversion(
        runner,
        &invocation,
        request.output(),
        request.engine(),
        progress,
    )
    .await?;

    let warnings: Vec<String> = run
        .stderr
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect();
    for w in &warnings {
        warn!("pandoc: {w}");
    }

    Ok(ConversionReport {
        input: request.input().to_path_buf(),
        output: request.output().to_path_buf(),
        output_bytes: run.output_bytes,
        duration_ms: run.duration.as_millis() as u64,
        engine: request.engine(),
        fonts: preset,
        command,
        warnings,
    })
}

/// Fail with `MissingDependency` for the first required tool that is absent.
async fn preflight<R: ProcessRunner>(
    engine: Engine,
    config: &ConversionConfig,
    runner: &R,
) -> Result<(), Md2PdfError> {
    let tools = config.tool_set(engine);
    for tool in tools.required() {
        let status = probe::probe_tool(runner, tool).await;
        if let Some(cb) = config.progress_callback.as_ref() {
            cb.on_probe(&status.name, status.found);
        }
        if !status.found {
            return Err(Md2PdfError::MissingDependency {
                tool: status.name,
                hint: tool.hint.clone(),
            });
        }
        debug!(
            "Pre-flight: {} {}",
            status.name,
            status.version.as_deref().unwrap_or("(version unknown)")
        );
    }
    Ok(())
}
