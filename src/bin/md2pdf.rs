//! CLI binary for edgequake-md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` / `ConversionRequest` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_md2pdf::{
    check_dependencies, convert, run_demo, ConversionConfig, ConversionProgressCallback,
    ConversionReport, ConversionRequest, ConversionState, DependencyReport, Engine, ErrorKind,
    FontPreset, FontSelection, Md2PdfError, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner driven by the conversion state machine.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Echo the converter command line above the spinner.
    echo_command: bool,
}

impl CliProgressCallback {
    fn new(echo_command: bool) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Checking toolchain…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, echo_command })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_state_change(&self, state: ConversionState) {
        match state {
            ConversionState::NotStarted => {}
            ConversionState::Running => {
                self.bar.set_prefix("Converting");
                self.bar.set_message("pandoc is typesetting…");
            }
            ConversionState::Succeeded | ConversionState::Failed => self.bar.finish_and_clear(),
        }
    }

    fn on_probe(&self, tool: &str, found: bool) {
        if found {
            self.bar.set_message(format!("{tool} ok"));
        } else {
            self.bar.println(format!("  {} {} not found", red("✗"), bold(tool)));
        }
    }

    fn on_invocation(&self, command: &str) {
        if self.echo_command {
            self.bar.println(format!("  {} {}", cyan("$"), dim(command)));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (XeLaTeX, auto-detected Japanese fonts)
  md2pdf notes.md notes.pdf

  # Pick an engine
  md2pdf --engine lualatex report.md report.pdf

  # Forward options to pandoc (must come last)
  md2pdf report.md report.pdf --options --toc --number-sections

  # Override a layout default; the built-in one is then skipped
  md2pdf report.md report.pdf --options --variable=papersize=letter

  # Generate and convert the built-in Japanese sample
  md2pdf --demo --demo-dir output

  # Check the toolchain (exit 3 when something required is missing)
  md2pdf --check
  md2pdf --check --json

EXIT CODES:
  0  success
  1  internal error
  2  invalid arguments (missing input, unknown engine, bad option)
  3  missing dependency (pandoc or the TeX engine)
  4  conversion failed (pandoc exited non-zero)
  5  output not produced (pandoc exited zero without a PDF)
  6  timeout

ENVIRONMENT VARIABLES:
  MD2PDF_ENGINE    Default engine (xelatex, pdflatex, lualatex)
  MD2PDF_PANDOC    Pandoc executable to run
  MD2PDF_FONT      Font preset (auto, noto, ipa, fallback, none)
  MD2PDF_TIMEOUT   Converter timeout in seconds
  RUST_LOG         Log filter, overrides -v / -q

SETUP (Debian/Ubuntu):
  sudo apt install pandoc texlive-xetex texlive-lang-japanese fonts-noto-cjk
"#;

/// Convert Markdown to PDF with Pandoc and Japanese font support.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Convert Markdown to PDF with Pandoc and Japanese font support",
    long_about = "Convert Markdown documents to PDF by running Pandoc with a LaTeX engine \
(XeLaTeX, pdfLaTeX or LuaLaTeX). Japanese fonts are detected through fontconfig and \
injected as CJK font variables; page layout defaults are added unless you set them yourself.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to convert.
    #[arg(required_unless_present_any = ["demo", "check"])]
    input: Option<PathBuf>,

    /// PDF file to write (parent directories are created).
    #[arg(required_unless_present_any = ["demo", "check"])]
    output: Option<PathBuf>,

    /// PDF engine: xelatex, pdflatex, lualatex.
    #[arg(
        short,
        long,
        env = "MD2PDF_ENGINE",
        default_value = "xelatex",
        value_parser = parse_engine
    )]
    engine: Engine,

    /// Extra options passed to pandoc verbatim (consumes the rest of the line).
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "OPT")]
    options: Vec<String>,

    /// Japanese font preset.
    #[arg(long, env = "MD2PDF_FONT", value_enum, default_value = "auto")]
    font: FontArg,

    /// Pandoc executable (name on PATH or full path).
    #[arg(long, env = "MD2PDF_PANDOC", default_value = "pandoc")]
    pandoc: PathBuf,

    /// Kill pandoc after this many seconds.
    #[arg(long, env = "MD2PDF_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Write and convert the built-in Japanese sample document.
    #[arg(long, conflicts_with = "check")]
    demo: bool,

    /// Directory for the demo files.
    #[arg(long, default_value = "output")]
    demo_dir: PathBuf,

    /// Check pandoc, the engine and Japanese fonts, then exit.
    #[arg(long)]
    check: bool,

    /// Print a JSON report on stdout.
    #[arg(long)]
    json: bool,

    /// Skip probing pandoc and the engine before converting.
    #[arg(long)]
    no_preflight: bool,

    /// Disable the spinner.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Echo the pandoc command, list every pandoc warning, DEBUG logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_engine(s: &str) -> Result<Engine, Md2PdfError> {
    s.parse()
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FontArg {
    Auto,
    Noto,
    Ipa,
    Fallback,
    None,
}

impl From<FontArg> for FontSelection {
    fn from(v: FontArg) -> Self {
        match v {
            FontArg::Auto => FontSelection::Auto,
            FontArg::Noto => FontSelection::Preset(FontPreset::NotoCjk),
            FontArg::Ipa => FontSelection::Preset(FontPreset::Ipa),
            FontArg::Fallback => FontSelection::Preset(FontPreset::Fallback),
            FontArg::None => FontSelection::Disabled,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(code) => code,
        Err(err) => {
            let code = exit_code_for(&err);
            let category = err
                .downcast_ref::<Md2PdfError>()
                .map(|e| e.kind().to_string())
                .unwrap_or_else(|| "error".to_string());
            eprintln!("{} {err:#}", red(&format!("✘ [{category}]")));
            ExitCode::from(code)
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<ExitCode> {
    // ── Check mode ───────────────────────────────────────────────────────
    if cli.check {
        let config = build_config(cli, None)?;
        let report = check_dependencies(cli.engine, &config).await;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            print_check(&report, cli.engine);
        }
        return Ok(if report.is_satisfied() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(ErrorKind::MissingDependency.exit_code() as u8)
        });
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}  {}",
            cyan("◆"),
            bold(&format!("md2pdf v{}", env!("CARGO_PKG_VERSION"))),
            dim(&format!("engine: {}", cli.engine)),
        );
    }

    // Validate paths before the spinner starts; no subprocess runs for a bad input.
    let request = if cli.demo {
        None
    } else {
        Some(build_request(cli)?)
    };

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(cli.verbose);
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress_cb)?;

    let report = match request {
        Some(request) => convert(&request, &config).await?,
        // ── Demo mode ────────────────────────────────────────────────────
        None => {
            let report = run_demo(&cli.demo_dir, cli.engine, &cli.options, cli.verbose, &config)
                .await
                .context("Demo conversion failed")?;
            if !cli.quiet && !cli.json {
                eprintln!("  {} demo source: {}", dim("•"), report.input.display());
            }
            report
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report, cli.verbose);
    }

    Ok(ExitCode::SUCCESS)
}

/// Map the positionals and engine flags to a validated `ConversionRequest`.
fn build_request(cli: &Cli) -> Result<ConversionRequest> {
    // clap requires both positionals unless --demo / --check is given.
    let (Some(input), Some(output)) = (&cli.input, &cli.output) else {
        return Err(Md2PdfError::InvalidArgument("INPUT and OUTPUT are required".into()).into());
    };
    Ok(ConversionRequest::builder(input, output)
        .engine(cli.engine)
        .options(cli.options.iter().cloned())
        .verbose(cli.verbose)
        .build()?)
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .pandoc(cli.pandoc.clone())
        .fonts(cli.font.into())
        .preflight(!cli.no_preflight);

    if let Some(secs) = cli.timeout {
        builder = builder.timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    Ok(builder.build()?)
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<Md2PdfError>()
        .map(|e| e.exit_code())
        .unwrap_or(1) as u8
}

fn print_summary(report: &ConversionReport, verbose: bool) {
    let fonts = report
        .fonts
        .map(|f| format!("{f} fonts"))
        .unwrap_or_else(|| "no CJK fonts".to_string());
    eprintln!(
        "{}  {}  {}",
        green("✔"),
        bold(&report.output.display().to_string()),
        dim(&format!(
            "{} bytes  {}ms  {}  {}",
            report.output_bytes, report.duration_ms, report.engine, fonts
        )),
    );

    if report.warnings.is_empty() {
        return;
    }
    if verbose {
        for w in &report.warnings {
            eprintln!("   {} {}", yellow("⚠"), w);
        }
    } else {
        eprintln!(
            "   {} {} warning line(s) from pandoc (use -v to show)",
            yellow("⚠"),
            report.warnings.len()
        );
    }
}

fn print_check(report: &DependencyReport, engine: Engine) {
    println!("{}", bold(&format!("Dependency check (engine: {engine})")));
    for tool in &report.tools {
        let (mark, detail) = match (tool.found, tool.required) {
            (true, _) => (
                green("✓"),
                tool.version.clone().unwrap_or_else(|| "version unknown".into()),
            ),
            (false, true) => (red("✗"), "not found".to_string()),
            (false, false) => (yellow("⚠"), "not found (optional)".to_string()),
        };
        println!("  {mark} {:<10} {detail}", tool.name);
        if let Some(path) = &tool.path {
            println!("    {}", dim(&path.display().to_string()));
        }
        if let Some(hint) = &tool.hint {
            println!("    {}", dim(hint));
        }
    }

    match report.fonts {
        Some(preset) => println!("  {} Japanese fonts: {preset}", green("✓")),
        None => println!(
            "  {} Japanese fonts: none detected\n    {}",
            yellow("⚠"),
            dim("Install: sudo apt install fonts-noto-cjk fonts-ipafont && fc-cache -fv")
        ),
    }

    if report.is_satisfied() {
        println!("{} all required tools found", green("✔"));
    } else {
        let missing: Vec<&str> = report.missing().map(|t| t.name.as_str()).collect();
        println!("{} missing: {}", red("✘"), missing.join(", "));
    }
}
