//! Progress-callback trait for conversion lifecycle events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to observe
//! a run as it moves through its states:
//!
//! ```text
//! NotStarted ──▶ Running ──▶ Succeeded
//!     │                └───▶ Failed
//!     └─────────────────────▶ Failed   (pre-flight found a missing tool)
//! ```
//!
//! The CLI uses this to drive a spinner while the converter runs; the
//! library itself never prints.
//!
//! # Example
//!
//! ```rust
//! use edgequake_md2pdf::{ConversionConfig, ConversionProgressCallback, ConversionState};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder(Mutex<Vec<ConversionState>>);
//!
//! impl ConversionProgressCallback for Recorder {
//!     fn on_state_change(&self, state: ConversionState) {
//!         self.0.lock().unwrap().push(state);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Recorder::default()))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a single conversion currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl ConversionState {
    /// `true` for `Succeeded` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConversionState::Succeeded | ConversionState::Failed)
    }
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversionState::NotStarted => "not started",
            ConversionState::Running => "running",
            ConversionState::Succeeded => "succeeded",
            ConversionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called by the conversion pipeline as it moves through a run.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called on every state transition, including the initial `NotStarted`.
    fn on_state_change(&self, state: ConversionState) {
        let _ = state;
    }

    /// Called once per probed tool during pre-flight.
    ///
    /// # Arguments
    /// * `tool`  — display name, e.g. `pandoc`
    /// * `found` — whether the tool could be started
    fn on_probe(&self, tool: &str, found: bool) {
        let _ = (tool, found);
    }

    /// Called right before the converter is spawned.
    ///
    /// # Arguments
    /// * `command` — the full command line, shell-quoted for display
    fn on_invocation(&self, command: &str) {
        let _ = command;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
