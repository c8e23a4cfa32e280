//! Configuration types for Markdown-to-PDF conversion.
//!
//! Everything that is fixed for the lifetime of a run lives in
//! [`ConversionConfig`], built via its [`ConversionConfigBuilder`]: the
//! converter program, the tools to probe, layout and font defaults, the
//! optional timeout. The value is immutable once built and is passed
//! explicitly to the prober, the invocation builder and the runner.
//!
//! Per-document values (paths, engine, passthrough options) live in
//! [`crate::request::ConversionRequest`] instead.

use crate::error::Md2PdfError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default converter executable, looked up on `PATH`.
pub const DEFAULT_PANDOC: &str = "pandoc";

/// fontconfig's font lister, used for CJK font detection.
pub const FC_LIST: &str = "fc-list";

/// Configuration for a Markdown-to-PDF conversion.
///
/// # Example
/// ```rust
/// use edgequake_md2pdf::{ConversionConfig, FontPreset, FontSelection};
///
/// let config = ConversionConfig::builder()
///     .pandoc("/opt/pandoc/bin/pandoc")
///     .fonts(FontSelection::Preset(FontPreset::NotoCjk))
///     .timeout_secs(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.timeout(), Some(std::time::Duration::from_secs(300)));
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Converter executable (name on `PATH` or explicit path). Default: `pandoc`.
    pub pandoc: PathBuf,

    /// Page layout defaults injected unless the caller overrides them.
    pub layout: LayoutDefaults,

    /// How CJK font variables are chosen. Default: [`FontSelection::Auto`].
    pub fonts: FontSelection,

    /// Probe the converter and engine before running. Default: true.
    ///
    /// Without it a missing converter is still reported as
    /// [`Md2PdfError::MissingDependency`], just later (at spawn time).
    pub preflight: bool,

    /// Kill the converter after this many seconds. Default: None (wait forever).
    pub timeout_secs: Option<u64>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            pandoc: PathBuf::from(DEFAULT_PANDOC),
            layout: LayoutDefaults::default(),
            fonts: FontSelection::default(),
            preflight: true,
            timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("pandoc", &self.pandoc)
            .field("layout", &self.layout)
            .field("fonts", &self.fonts)
            .field("preflight", &self.preflight)
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The converter timeout as a [`Duration`], if one is set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The external tools a conversion with `engine` depends on.
    pub fn tool_set(&self, engine: Engine) -> ToolSet {
        ToolSet::new(self.pandoc.clone(), engine)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn pandoc(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.pandoc = program.into();
        self
    }

    pub fn layout(mut self, layout: LayoutDefaults) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn fonts(mut self, fonts: FontSelection) -> Self {
        self.config.fonts = fonts;
        self
    }

    pub fn preflight(mut self, v: bool) -> Self {
        self.config.preflight = v;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        let c = &self.config;
        if c.pandoc.as_os_str().is_empty() {
            return Err(Md2PdfError::InvalidConfig(
                "converter program must not be empty".into(),
            ));
        }
        if c.timeout_secs == Some(0) {
            return Err(Md2PdfError::InvalidConfig(
                "timeout must be ≥ 1 second".into(),
            ));
        }
        c.layout.validate()?;
        Ok(self.config)
    }
}

// ── Engine ───────────────────────────────────────────────────────────────

/// The LaTeX backend Pandoc delegates PDF rendering to.
///
/// | Engine | Role |
/// |--------|------|
/// | `xelatex`  | Unicode-capable, CJK via xeCJK (default, recommended for Japanese) |
/// | `pdflatex` | Standard engine, no native CJK font handling |
/// | `lualatex` | Extended-macro engine, CJK via LuaTeX-ja |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Xelatex,
    Pdflatex,
    Lualatex,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::Xelatex, Engine::Pdflatex, Engine::Lualatex];

    /// Identifier used both on the command line and as the executable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Xelatex => "xelatex",
            Engine::Pdflatex => "pdflatex",
            Engine::Lualatex => "lualatex",
        }
    }

    /// The `--pdf-engine=…` flag passed to Pandoc.
    pub fn pandoc_flag(self) -> String {
        format!("--pdf-engine={}", self.as_str())
    }

    /// Whether the engine can load system OpenType fonts (and so honours
    /// the `CJKmainfont` family of variables).
    pub fn supports_system_fonts(self) -> bool {
        !matches!(self, Engine::Pdflatex)
    }

    /// Package hint shown when the engine binary is missing.
    pub fn install_hint(self) -> &'static str {
        match self {
            Engine::Xelatex => "Install: sudo apt install texlive-xetex texlive-lang-japanese",
            Engine::Pdflatex => "Install: sudo apt install texlive-latex-base texlive-latex-recommended",
            Engine::Lualatex => "Install: sudo apt install texlive-luatex texlive-lang-japanese",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = Md2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xelatex" => Ok(Engine::Xelatex),
            "pdflatex" => Ok(Engine::Pdflatex),
            "lualatex" => Ok(Engine::Lualatex),
            _ => Err(Md2PdfError::UnknownEngine {
                name: s.to_string(),
            }),
        }
    }
}

// ── Fonts ────────────────────────────────────────────────────────────────

/// A fixed set of CJK font families for the serif, sans and mono roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontPreset {
    /// Noto Serif/Sans CJK JP. Best coverage; the recommended install.
    NotoCjk,
    /// IPAex Mincho / Gothic.
    Ipa,
    /// DejaVu; renders Latin text, CJK glyphs only if the family covers them.
    Fallback,
}

impl FontPreset {
    /// `(variable, family)` pairs for this preset, in injection order.
    pub fn variables(self) -> &'static [(&'static str, &'static str)] {
        match self {
            FontPreset::NotoCjk => &[
                ("CJKmainfont", "Noto Serif CJK JP"),
                ("CJKsansfont", "Noto Sans CJK JP"),
                ("CJKmonofont", "Noto Sans Mono CJK JP"),
            ],
            FontPreset::Ipa => &[
                ("CJKmainfont", "IPAexMincho"),
                ("CJKsansfont", "IPAexGothic"),
                ("CJKmonofont", "IPAGothic"),
            ],
            FontPreset::Fallback => &[
                ("CJKmainfont", "DejaVu Serif"),
                ("CJKsansfont", "DejaVu Sans"),
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FontPreset::NotoCjk => "Noto CJK",
            FontPreset::Ipa => "IPA",
            FontPreset::Fallback => "fallback (DejaVu)",
        }
    }
}

impl fmt::Display for FontPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the CJK font preset is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontSelection {
    /// Ask fontconfig which Japanese fonts are installed. (default)
    #[default]
    Auto,
    /// Use this preset without probing.
    Preset(FontPreset),
    /// Inject no font variables at all.
    Disabled,
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Document-layout defaults, injected as `--variable` flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDefaults {
    /// Page margin passed to the `geometry` package. Default: `2cm`.
    pub margin: String,
    /// Base font size. Default: `12pt`.
    pub font_size: String,
    /// Paper size. Default: `a4`.
    pub paper_size: String,
    /// LaTeX document class. Default: `article`.
    pub document_class: String,
}

impl Default for LayoutDefaults {
    fn default() -> Self {
        Self {
            margin: "2cm".into(),
            font_size: "12pt".into(),
            paper_size: "a4".into(),
            document_class: "article".into(),
        }
    }
}

impl LayoutDefaults {
    /// `(key, flag)` pairs in injection order. `key` is the variable name a
    /// caller option must set to suppress the flag.
    pub fn flags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("geometry", format!("--variable=geometry:margin={}", self.margin)),
            ("fontsize", format!("--variable=fontsize={}", self.font_size)),
            ("papersize", format!("--variable=papersize={}", self.paper_size)),
            (
                "documentclass",
                format!("--variable=documentclass={}", self.document_class),
            ),
        ]
    }

    fn validate(&self) -> Result<(), Md2PdfError> {
        for (name, value) in [
            ("margin", &self.margin),
            ("font size", &self.font_size),
            ("paper size", &self.paper_size),
            ("document class", &self.document_class),
        ] {
            if value.trim().is_empty() {
                return Err(Md2PdfError::InvalidConfig(format!(
                    "layout {name} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

// ── Tool set ─────────────────────────────────────────────────────────────

/// One external tool the prober checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredTool {
    /// Display name (`pandoc`, `xelatex`, `fc-list`).
    pub name: String,
    /// Executable to run.
    pub program: PathBuf,
    /// Whether absence fails `--check` and pre-flight.
    pub required: bool,
    /// Installation hint shown when the tool is missing.
    pub hint: String,
}

/// The ordered list of tools a conversion depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSet {
    pub tools: Vec<RequiredTool>,
}

impl ToolSet {
    /// Converter, engine binary and fontconfig (optional), in that order.
    pub fn new(pandoc: PathBuf, engine: Engine) -> Self {
        Self {
            tools: vec![
                RequiredTool {
                    name: "pandoc".into(),
                    program: pandoc,
                    required: true,
                    hint: "Install: https://pandoc.org/installing.html".into(),
                },
                RequiredTool {
                    name: engine.as_str().into(),
                    program: PathBuf::from(engine.as_str()),
                    required: true,
                    hint: engine.install_hint().into(),
                },
                RequiredTool {
                    name: FC_LIST.into(),
                    program: PathBuf::from(FC_LIST),
                    required: false,
                    hint: "Install: sudo apt install fontconfig fonts-noto-cjk fonts-ipafont".into(),
                },
            ],
        }
    }

    /// Only the tools whose absence is fatal.
    pub fn required(&self) -> impl Iterator<Item = &RequiredTool> {
        self.tools.iter().filter(|t| t.required)
    }
}
