//! Invocation building: turn a request into the exact converter command line.
//!
//! [`build_invocation`] is a pure function. The same request, config and
//! font preset always yield a byte-identical argument list, and nothing
//! touches the file system.
//!
//! ## Argument order
//!
//! ```text
//! <input> -o <output> --pdf-engine=<engine> --from=markdown --to=pdf
//!     [layout defaults] [CJK font variables] [passthrough…]
//! ```
//!
//! Layout defaults and font variables are *defaults*: each one is skipped
//! when a passthrough option already sets the same Pandoc variable (or
//! metadata field), so an explicit caller choice is never overridden.
//! Passthrough options are appended last, verbatim and in order. The
//! request's `verbose` flag is not forwarded; it only affects logging.

use crate::config::{ConversionConfig, FontPreset};
use crate::request::ConversionRequest;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// A fully formed external command: program plus ordered arguments.
///
/// Arguments are OS strings so file paths reach the child byte for byte,
/// including names that are not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Short program name for messages (`pandoc` for `/usr/bin/pandoc`).
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Shell-quoted command line, for logs and verbose echo only.
    ///
    /// Lossy: bytes that are not UTF-8 show as U+FFFD.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|a| shell_quote(&a.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_alphanumeric() || "-_=:./,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Build the converter invocation for `request`.
///
/// `fonts` is the already-resolved CJK preset; it is ignored for engines
/// that cannot load system fonts.
pub fn build_invocation(
    request: &ConversionRequest,
    config: &ConversionConfig,
    fonts: Option<FontPreset>,
) -> Invocation {
    let engine = request.engine();
    let caller_keys = variable_keys(request.options());

    let mut args: Vec<OsString> = vec![
        request.input().as_os_str().to_owned(),
        "-o".into(),
        request.output().as_os_str().to_owned(),
        engine.pandoc_flag().into(),
        "--from=markdown".into(),
        "--to=pdf".into(),
    ];

    for (key, flag) in config.layout.flags() {
        if !caller_keys.contains(key) {
            args.push(flag.into());
        }
    }

    if let Some(preset) = fonts.filter(|_| engine.supports_system_fonts()) {
        for (key, family) in preset.variables() {
            if !caller_keys.contains(*key) {
                args.push(format!("--variable={key}={family}").into());
            }
        }
    }

    if request
        .options()
        .iter()
        .any(|o| o == "--pdf-engine" || o.starts_with("--pdf-engine="))
    {
        warn!("Passthrough options set --pdf-engine; the converter will see two engine flags");
    }
    args.extend(request.options().iter().map(OsString::from));

    Invocation::new(config.pandoc.clone(), args)
}

// ── Passthrough key sniffing ─────────────────────────────────────────────

/// `--variable[=…]`, `--metadata[=…]`, `-V…`, `-M…`; group 1 holds whatever
/// follows the flag on the same token.
static RE_VAR_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:--(?:variable|metadata)(?:=|$)|-[VM])(.*)$").unwrap());

/// Key of a `KEY`, `KEY=VALUE` or `KEY:VALUE` assignment.
static RE_ASSIGNMENT_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([^=:\s]+)").unwrap());

/// Collect the Pandoc variable/metadata keys a list of options assigns.
///
/// Handles both the joined (`--variable=papersize=a5`, `-Vpapersize=a5`)
/// and the split (`-V papersize=a5`) spellings.
pub fn variable_keys(options: &[String]) -> HashSet<String> {
    let mut keys = HashSet::new();
    let mut iter = options.iter();

    while let Some(opt) = iter.next() {
        let Some(caps) = RE_VAR_FLAG.captures(opt) else {
            continue;
        };
        let inline = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let assignment = if inline.is_empty() {
            match iter.next() {
                Some(next) => next.as_str(),
                None => break,
            }
        } else {
            inline
        };
        if let Some(key) = RE_ASSIGNMENT_KEY.captures(assignment).and_then(|c| c.get(1)) {
            keys.insert(key.as_str().to_string());
        }
    }

    keys
}
