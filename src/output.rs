//! Result types returned by the conversion and check entry points.

use crate::config::{Engine, FontPreset};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Summary of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Markdown input, as given.
    pub input: PathBuf,
    /// Produced PDF, as given.
    pub output: PathBuf,
    /// Size of the produced PDF in bytes (always > 0).
    pub output_bytes: u64,
    /// Wall-clock time the converter ran.
    pub duration_ms: u64,
    /// Engine the converter was asked to use.
    pub engine: Engine,
    /// CJK font preset injected, if any.
    pub fonts: Option<FontPreset>,
    /// The exact command line that was run, shell-quoted for display.
    pub command: String,
    /// Non-empty lines the converter wrote to stderr despite succeeding
    /// (LaTeX warnings, missing-character notices, …).
    pub warnings: Vec<String>,
}

/// Result of probing a single external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Display name, e.g. `pandoc`.
    pub name: String,
    /// Whether the tool could be started.
    pub found: bool,
    /// First line of the version output, when the tool reported one.
    pub version: Option<String>,
    /// Where the tool resolves on `PATH`, when resolvable.
    pub path: Option<PathBuf>,
    /// Whether absence is fatal.
    pub required: bool,
    /// Installation hint for a missing tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Everything `--check` reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyReport {
    pub tools: Vec<DependencyStatus>,
    /// Best Japanese font preset fontconfig reported, if any Japanese font
    /// is installed.
    pub fonts: Option<FontPreset>,
}

impl DependencyReport {
    /// `true` when every required tool was found.
    pub fn is_satisfied(&self) -> bool {
        self.tools.iter().filter(|t| t.required).all(|t| t.found)
    }

    /// Required tools that were not found.
    pub fn missing(&self) -> impl Iterator<Item = &DependencyStatus> {
        self.tools.iter().filter(|t| t.required && !t.found)
    }

    /// Look up a tool by display name.
    pub fn get(&self, name: &str) -> Option<&DependencyStatus> {
        self.tools.iter().find(|t| t.name == name)
    }
}
