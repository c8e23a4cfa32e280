//! Conversion running: execute an [`Invocation`] and classify the outcome.
//!
//! ## The process-runner seam
//!
//! Spawning is behind the single-method [`ProcessRunner`] trait: an
//! invocation goes in, exit state, captured output and wall-clock duration
//! come out. [`TokioProcessRunner`] is the real implementation; tests plug
//! in scripted fakes so every classification below can be exercised
//! without Pandoc or TeX installed.
//!
//! ## Classification
//!
//! | Outcome | Result |
//! |---------|--------|
//! | spawn fails with `NotFound` | [`Md2PdfError::MissingDependency`] (converter) |
//! | exit 47 (Pandoc: PDF engine not found) | [`Md2PdfError::MissingDependency`] (engine) |
//! | other non-zero exit, or killed by signal | [`Md2PdfError::ConversionFailed`] with stderr |
//! | exit 0, output missing or empty | [`Md2PdfError::OutputNotProduced`] |
//! | limit exceeded | [`Md2PdfError::Timeout`], child killed |
//! | exit 0, output non-empty | success |
//!
//! The output path is snapshotted (size and modification time) before the
//! converter starts. A file that is unchanged afterwards was not written by
//! this run: it never counts as success and is never deleted. On failure,
//! a file the run created or modified is removed, so no partial PDF is
//! mistaken for a result.
//!
//! A pre-existing output is first backdated to the Unix epoch, so a rewrite
//! shows up as a new modification time even on file systems that only keep
//! whole or even seconds. Its original time is put back if the converter
//! leaves it alone.

use crate::config::Engine;
use crate::error::Md2PdfError;
use crate::pipeline::invocation::Invocation;
use crate::progress::{ConversionState, ProgressCallback};
use std::future::Future;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Pandoc's exit code for "PDF engine not found".
pub const PANDOC_PDF_PROGRAM_NOT_FOUND: i32 = 47;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Normal exit with this status code.
    Exited(i32),
    /// Killed by a signal (Unix) before exiting.
    Terminated,
    /// Did not exit within the limit and was killed.
    TimedOut { after: Duration },
}

/// Everything a [`ProcessRunner`] reports about one run.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit: ExitState,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Wall-clock time from spawn to exit.
    pub duration: Duration,
}

impl ProcessOutcome {
    /// `true` when the process exited with status 0.
    pub fn success(&self) -> bool {
        self.exit == ExitState::Exited(0)
    }
}

/// Capability to run an external command to completion.
///
/// Implementations return `Err` only when the process could not be
/// started; anything that happens after spawn is described by the
/// returned [`ProcessOutcome`].
pub trait ProcessRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = io::Result<ProcessOutcome>> + Send;
}

/// Runs commands as real child processes on the Tokio runtime.
///
/// The child inherits the working directory and environment, gets a null
/// stdin, and has stdout/stderr captured. With a timeout set, a child that
/// outlives it is killed.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner {
    timeout: Option<Duration>,
}

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutcome> {
        let start = Instant::now();

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                // Dropping the wait future drops the child, which kills it.
                Err(_) => {
                    return Ok(ProcessOutcome {
                        exit: ExitState::TimedOut { after: limit },
                        stdout: String::new(),
                        stderr: String::new(),
                        duration: start.elapsed(),
                    })
                }
            },
            None => child.wait_with_output().await?,
        };

        let exit = match output.status.code() {
            Some(code) => ExitState::Exited(code),
            None => ExitState::Terminated,
        };

        Ok(ProcessOutcome {
            exit,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        })
    }
}

/// What a successful conversion run produced.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    /// Size of the output file in bytes (> 0).
    pub output_bytes: u64,
    pub duration: Duration,
    /// Converter stderr, kept for warnings.
    pub stderr: String,
}

/// Run the converter invocation and verify its output.
///
/// Emits `Running` and then `Succeeded` or `Failed` to `progress`.
pub async fn run_conversion<R: ProcessRunner>(
    runner: &R,
    invocation: &Invocation,
    output: &Path,
    engine: Engine,
    progress: Option<&ProgressCallback>,
) -> Result<CompletedRun, Md2PdfError> {
    create_parent_dir(output).await?;
    let original_mtime = backdate_existing(output).await;
    let before = OutputSnapshot::take(output).await;

    notify(progress, ConversionState::Running);
    let result = run_and_verify(runner, invocation, output, engine, before).await;

    match &result {
        Ok(run) => {
            info!(
                "Converter finished in {}ms → {} ({} bytes)",
                run.duration.as_millis(),
                output.display(),
                run.output_bytes
            );
            notify(progress, ConversionState::Succeeded);
        }
        Err(e) => {
            let after = OutputSnapshot::take(output).await;
            if after.is_some() && after == before {
                if let Some(mtime) = original_mtime {
                    restore_mtime(output, mtime).await;
                }
            } else if after.is_some() {
                remove_partial_output(output).await;
            }
            debug!("Conversion failed: {e}");
            notify(progress, ConversionState::Failed);
        }
    }

    result
}

async fn run_and_verify<R: ProcessRunner>(
    runner: &R,
    invocation: &Invocation,
    output: &Path,
    engine: Engine,
    before: Option<OutputSnapshot>,
) -> Result<CompletedRun, Md2PdfError> {
    let outcome = match runner.run(invocation).await {
        Ok(o) => o,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Md2PdfError::MissingDependency {
                tool: invocation.program_name(),
                hint: "Install Pandoc: https://pandoc.org/installing.html".into(),
            })
        }
        Err(e) => {
            return Err(Md2PdfError::SpawnFailed {
                program: invocation.program_name(),
                source: e,
            })
        }
    };
    debug!(
        "Converter exited: {:?} after {}ms",
        outcome.exit,
        outcome.duration.as_millis()
    );

    match outcome.exit {
        ExitState::TimedOut { after } => Err(Md2PdfError::Timeout {
            secs: after.as_secs(),
        }),
        ExitState::Terminated => Err(Md2PdfError::ConversionFailed {
            code: None,
            stderr: outcome.stderr,
            hint: None,
        }),
        ExitState::Exited(PANDOC_PDF_PROGRAM_NOT_FOUND) => Err(Md2PdfError::MissingDependency {
            tool: engine.as_str().to_string(),
            hint: engine.install_hint().to_string(),
        }),
        ExitState::Exited(0) => {
            let after = OutputSnapshot::take(output).await;
            match after {
                Some(snap) if after != before && snap.len > 0 => Ok(CompletedRun {
                    output_bytes: snap.len,
                    duration: outcome.duration,
                    stderr: outcome.stderr,
                }),
                Some(snap) if after != before => Err(Md2PdfError::OutputNotProduced {
                    path: output.to_path_buf(),
                    empty: snap.len == 0,
                }),
                _ => Err(Md2PdfError::OutputNotProduced {
                    path: output.to_path_buf(),
                    empty: false,
                }),
            }
        }
        ExitState::Exited(code) => {
            let hint = diagnose_stderr(&outcome.stderr);
            Err(Md2PdfError::ConversionFailed {
                code: Some(code),
                stderr: outcome.stderr,
                hint,
            })
        }
    }
}

/// Size and modification time of the output file, if it is a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutputSnapshot {
    len: u64,
    modified: Option<SystemTime>,
}

impl OutputSnapshot {
    async fn take(path: &Path) -> Option<Self> {
        let meta = tokio::fs::metadata(path).await.ok()?;
        meta.is_file().then(|| Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

async fn create_parent_dir(output: &Path) -> Result<(), Md2PdfError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Md2PdfError::WriteFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            info!("Created output directory: {}", parent.display());
        }
    }
    Ok(())
}

/// Set the modification time of an existing output file to the epoch.
///
/// Returns the original time, or `None` when there is no file or it could
/// not be touched (the plain snapshot comparison still applies then).
async fn backdate_existing(output: &Path) -> Option<SystemTime> {
    let meta = tokio::fs::metadata(output).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    let original = meta.modified().ok()?;
    match set_mtime(output, UNIX_EPOCH).await {
        Ok(()) => Some(original),
        Err(e) => {
            debug!("Could not backdate existing output {}: {e}", output.display());
            None
        }
    }
}

async fn restore_mtime(output: &Path, mtime: SystemTime) {
    if let Err(e) = set_mtime(output, mtime).await {
        warn!("Could not restore modification time of {}: {e}", output.display());
    }
}

async fn set_mtime(path: &Path, mtime: SystemTime) -> io::Result<()> {
    let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
    file.into_std().await.set_modified(mtime)
}

/// Remove an output file this run created or modified.
async fn remove_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => info!("Removed partial output: {}", output.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {e}", output.display()),
    }
}

fn notify(progress: Option<&ProgressCallback>, state: ConversionState) {
    if let Some(cb) = progress {
        cb.on_state_change(state);
    }
}

/// Suggest a fix for well-known converter failures.
pub fn diagnose_stderr(stderr: &str) -> Option<String> {
    let lower = stderr.to_lowercase();
    if lower.contains(".sty' not found") || lower.contains(".sty not found") {
        Some(
            "A LaTeX package is missing. Install the Japanese TeX collection:\n  \
             sudo apt install texlive-lang-japanese texlive-latex-extra"
                .to_string(),
        )
    } else if lower.contains("font") || lower.contains("cjk") {
        Some(
            "This looks like a Japanese font problem. Install CJK fonts and refresh the cache:\n  \
             sudo apt install fonts-noto-cjk fonts-ipafont\n  \
             fc-cache -fv"
                .to_string(),
        )
    } else {
        None
    }
}
