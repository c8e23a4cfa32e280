//! Pipeline integration tests driven by a scripted process runner.
//!
//! No real Pandoc or TeX is needed: the fake runner answers `--version`
//! probes and `fc-list`, and plays back a scripted converter outcome,
//! optionally writing bytes to the declared output path the way Pandoc
//! would.

use edgequake_md2pdf::{
    check_dependencies_with_runner, convert_with_runner, ConversionConfig,
    ConversionProgressCallback, ConversionRequest, ConversionState, Engine, ErrorKind, ExitState,
    FontPreset, FontSelection, Invocation, Md2PdfError, ProcessOutcome, ProcessRunner,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// What the fake converter does when invoked.
#[derive(Clone)]
struct Script {
    exit: ExitState,
    stderr: &'static str,
    /// Bytes written to the `-o` path before "exiting".
    writes: Option<&'static [u8]>,
}

impl Script {
    fn ok_pdf() -> Self {
        Self {
            exit: ExitState::Exited(0),
            stderr: "",
            writes: Some(b"%PDF-1.5\n%fake\n"),
        }
    }
}

struct ScriptedRunner {
    /// Program names whose spawn fails with `NotFound`.
    missing: Vec<&'static str>,
    /// `fc-list :lang=ja family` output.
    fonts: &'static str,
    script: Script,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    fn new(script: Script) -> Self {
        Self {
            missing: Vec::new(),
            fonts: "Noto Sans CJK JP\n",
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn missing(mut self, programs: &[&'static str]) -> Self {
        self.missing.extend_from_slice(programs);
        self
    }

    fn conversions(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.args.iter().any(|a| a == "-o"))
            .cloned()
            .collect()
    }
}

fn outcome(exit: ExitState, stdout: &str, stderr: &str) -> ProcessOutcome {
    ProcessOutcome {
        exit,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        duration: Duration::from_millis(3),
    }
}

impl ProcessRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutcome> {
        self.calls.lock().unwrap().push(invocation.clone());
        let name = invocation.program_name();

        if self.missing.iter().any(|m| *m == name) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory"));
        }
        if invocation.args == ["--version"] {
            return Ok(outcome(ExitState::Exited(0), &format!("{name} 1.0"), ""));
        }
        if name == "fc-list" {
            return Ok(outcome(ExitState::Exited(0), self.fonts, ""));
        }

        if let Some(bytes) = self.script.writes {
            let pos = invocation.args.iter().position(|a| a == "-o").unwrap();
            std::fs::write(&invocation.args[pos + 1], bytes).unwrap();
        }
        Ok(outcome(self.script.exit, "", self.script.stderr))
    }
}

#[derive(Default)]
struct StateRecorder(Mutex<Vec<ConversionState>>);

impl ConversionProgressCallback for StateRecorder {
    fn on_state_change(&self, state: ConversionState) {
        self.0.lock().unwrap().push(state);
    }
}

fn markdown_fixture(dir: &Path) -> PathBuf {
    let md = dir.join("doc.md");
    std::fs::write(&md, "# 見出し\n\n$E = mc^2$\n").unwrap();
    md
}

fn request(dir: &Path, engine: Engine, options: &[&str]) -> ConversionRequest {
    ConversionRequest::builder(markdown_fixture(dir), dir.join("out/doc.pdf"))
        .engine(engine)
        .options(options.iter().copied())
        .build()
        .unwrap()
}

// ── Success ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_run_reports_pdf_and_states() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &["--toc", "--number-sections"]);
    let recorder = Arc::new(StateRecorder::default());
    let config = ConversionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let runner = ScriptedRunner::new(Script {
        stderr: "[WARNING] Missing character: There is no ✓ in font\n",
        ..Script::ok_pdf()
    });

    let report = convert_with_runner(&req, &config, &runner).await.unwrap();

    assert!(report.output_bytes > 0);
    assert_eq!(report.output, dir.path().join("out/doc.pdf"));
    assert_eq!(report.fonts, Some(FontPreset::NotoCjk));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.command.contains("--pdf-engine=xelatex"));
    assert!(dir.path().join("out/doc.pdf").exists());

    let states = recorder.0.lock().unwrap().clone();
    assert_eq!(
        states,
        vec![
            ConversionState::NotStarted,
            ConversionState::Running,
            ConversionState::Succeeded
        ]
    );

    let conversions = runner.conversions();
    assert_eq!(conversions.len(), 1);
    let args = &conversions[0].args;
    let n = args.len();
    assert_eq!(&args[n - 2..], ["--toc", "--number-sections"]);
    assert!(args.iter().any(|a| a == "--variable=CJKmainfont=Noto Serif CJK JP"));
}

#[tokio::test]
async fn pdflatex_gets_no_font_variables() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Pdflatex, &[]);
    let runner = ScriptedRunner::new(Script::ok_pdf());

    let report = convert_with_runner(&req, &ConversionConfig::default(), &runner)
        .await
        .unwrap();

    assert_eq!(report.fonts, None);
    let args = &runner.conversions()[0].args;
    let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
    assert!(args.iter().all(|a| !a.starts_with("--variable=CJK")));
    assert_eq!(
        args.iter().filter(|a| a.starts_with("--pdf-engine=")).count(),
        1
    );
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn undefined_control_sequence_surfaces_stderr_and_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    let recorder = Arc::new(StateRecorder::default());
    let config = ConversionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let stderr = "! Undefined control sequence.\nl.42 \\foo\n";
    let runner = ScriptedRunner::new(Script {
        exit: ExitState::Exited(1),
        stderr,
        writes: Some(b"%PDF-1.5 partial"),
    });

    let err = convert_with_runner(&req, &config, &runner).await.unwrap_err();

    match &err {
        Md2PdfError::ConversionFailed { code, stderr: got, .. } => {
            assert_eq!(*code, Some(1));
            assert_eq!(got, stderr);
        }
        other => panic!("expected ConversionFailed, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 4);
    assert!(!req.output().exists(), "partial output must be removed");
    assert_eq!(
        recorder.0.lock().unwrap().last(),
        Some(&ConversionState::Failed)
    );
}

#[tokio::test]
async fn missing_converter_is_missing_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    let config = ConversionConfig::default();
    let runner = ScriptedRunner::new(Script::ok_pdf()).missing(&["pandoc"]);

    let report = check_dependencies_with_runner(Engine::Xelatex, &config, &runner).await;
    let pandoc = report.get("pandoc").unwrap();
    assert!(!pandoc.found);
    assert!(!report.is_satisfied());

    let err = convert_with_runner(&req, &config, &runner).await.unwrap_err();
    assert!(matches!(err, Md2PdfError::MissingDependency { ref tool, .. } if tool == "pandoc"));
    assert!(runner.conversions().is_empty(), "pre-flight must stop the run");
}

#[tokio::test]
async fn missing_converter_without_preflight_fails_at_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    let config = ConversionConfig::builder()
        .preflight(false)
        .fonts(FontSelection::Disabled)
        .build()
        .unwrap();
    let runner = ScriptedRunner::new(Script::ok_pdf()).missing(&["pandoc"]);

    let err = convert_with_runner(&req, &config, &runner).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingDependency);
    assert!(!req.output().exists());
}

#[tokio::test]
async fn missing_engine_found_by_preflight() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Lualatex, &[]);
    let runner = ScriptedRunner::new(Script::ok_pdf()).missing(&["lualatex"]);

    let err = convert_with_runner(&req, &ConversionConfig::default(), &runner)
        .await
        .unwrap_err();
    match err {
        Md2PdfError::MissingDependency { tool, hint } => {
            assert_eq!(tool, "lualatex");
            assert!(hint.contains("texlive-luatex"));
        }
        other => panic!("expected MissingDependency, got {other:?}"),
    }
}

#[tokio::test]
async fn pandoc_exit_47_means_engine_missing() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    let config = ConversionConfig::builder().preflight(false).build().unwrap();
    let runner = ScriptedRunner::new(Script {
        exit: ExitState::Exited(47),
        stderr: "xelatex not found. Please select a different --pdf-engine or install xelatex\n",
        writes: None,
    });

    let err = convert_with_runner(&req, &config, &runner).await.unwrap_err();
    assert!(matches!(err, Md2PdfError::MissingDependency { ref tool, .. } if tool == "xelatex"));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn zero_exit_with_empty_output_is_not_produced() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    let runner = ScriptedRunner::new(Script {
        writes: Some(b""),
        ..Script::ok_pdf()
    });

    let err = convert_with_runner(&req, &ConversionConfig::default(), &runner)
        .await
        .unwrap_err();
    assert!(matches!(err, Md2PdfError::OutputNotProduced { empty: true, .. }));
    assert_eq!(err.exit_code(), 5);
    assert!(!req.output().exists(), "empty output must be removed");
}

#[tokio::test]
async fn zero_exit_without_output_is_not_produced() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    let runner = ScriptedRunner::new(Script {
        writes: None,
        ..Script::ok_pdf()
    });

    let err = convert_with_runner(&req, &ConversionConfig::default(), &runner)
        .await
        .unwrap_err();
    assert!(matches!(err, Md2PdfError::OutputNotProduced { empty: false, .. }));
}

#[tokio::test]
async fn untouched_previous_pdf_is_neither_success_nor_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    std::fs::create_dir_all(req.output().parent().unwrap()).unwrap();
    std::fs::write(req.output(), b"%PDF-1.4 from yesterday").unwrap();

    let runner = ScriptedRunner::new(Script {
        writes: None,
        ..Script::ok_pdf()
    });
    let err = convert_with_runner(&req, &ConversionConfig::default(), &runner)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OutputNotProduced);
    assert_eq!(
        std::fs::read(req.output()).unwrap(),
        b"%PDF-1.4 from yesterday"
    );
}

#[tokio::test]
async fn overwritten_previous_pdf_counts_as_success() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    std::fs::create_dir_all(req.output().parent().unwrap()).unwrap();
    std::fs::write(req.output(), b"%PDF-1.4 from yesterday").unwrap();

    let runner = ScriptedRunner::new(Script::ok_pdf());
    let report = convert_with_runner(&req, &ConversionConfig::default(), &runner)
        .await
        .unwrap();

    assert_eq!(report.output_bytes, b"%PDF-1.5\n%fake\n".len() as u64);
    assert_eq!(std::fs::read(req.output()).unwrap(), b"%PDF-1.5\n%fake\n");
}

#[tokio::test]
async fn killed_converter_fails_without_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    let runner = ScriptedRunner::new(Script {
        exit: ExitState::Terminated,
        stderr: "[makePDF] Running xelatex\n",
        writes: Some(b"%PDF-1.5 half"),
    });

    let err = convert_with_runner(&req, &ConversionConfig::default(), &runner)
        .await
        .unwrap_err();

    match &err {
        Md2PdfError::ConversionFailed { code, stderr, .. } => {
            assert_eq!(*code, None);
            assert_eq!(stderr, "[makePDF] Running xelatex\n");
        }
        other => panic!("expected ConversionFailed, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 4);
    assert!(!req.output().exists(), "partial output must be removed");
}

#[tokio::test]
async fn timeout_is_reported_as_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    let runner = ScriptedRunner::new(Script {
        exit: ExitState::TimedOut {
            after: Duration::from_secs(30),
        },
        stderr: "",
        writes: None,
    });

    let err = convert_with_runner(&req, &ConversionConfig::default(), &runner)
        .await
        .unwrap_err();
    assert!(matches!(err, Md2PdfError::Timeout { secs: 30 }));
    assert_eq!(err.exit_code(), 6);
}

#[tokio::test]
async fn font_error_gets_install_hint() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path(), Engine::Xelatex, &[]);
    let runner = ScriptedRunner::new(Script {
        exit: ExitState::Exited(43),
        stderr: "! Package fontspec Error: The font \"Noto Serif CJK JP\" cannot be found.\n",
        writes: None,
    });

    let err = convert_with_runner(&req, &ConversionConfig::default(), &runner)
        .await
        .unwrap_err();
    match &err {
        Md2PdfError::ConversionFailed { hint, .. } => {
            assert!(hint.as_deref().unwrap().contains("fc-cache"));
        }
        other => panic!("expected ConversionFailed, got {other:?}"),
    }
    assert!(err.to_string().contains("cannot be found"));
}

// ── Requests ─────────────────────────────────────────────────────────────────

#[test]
fn missing_input_is_rejected_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConversionRequest::new(dir.path().join("nope.md"), dir.path().join("nope.pdf"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn check_report_detects_fonts_when_fontconfig_present() {
    let runner = ScriptedRunner {
        fonts: "IPAexGothic\nIPAexMincho\n",
        ..ScriptedRunner::new(Script::ok_pdf())
    };
    let report = tokio_test::block_on(check_dependencies_with_runner(
        Engine::Xelatex,
        &ConversionConfig::default(),
        &runner,
    ));
    assert!(report.is_satisfied());
    assert_eq!(report.fonts, Some(FontPreset::Ipa));
    assert_eq!(report.get("pandoc").unwrap().version.as_deref(), Some("pandoc 1.0"));
}
