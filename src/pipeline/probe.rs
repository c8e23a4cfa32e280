//! Dependency probing: is each external tool reachable, and which version?
//!
//! Every tool is asked for `--version` through the same [`ProcessRunner`]
//! the conversion uses. A tool counts as found when it can be started at
//! all. Only a zero exit yields a version: the first non-empty line of
//! stdout, or of stderr for tools that print their banner there.

use crate::config::{RequiredTool, ToolSet};
use crate::output::DependencyStatus;
use crate::pipeline::invocation::Invocation;
use crate::pipeline::runner::{ExitState, ProcessRunner};
use crate::progress::ProgressCallback;
use tracing::{debug, warn};

/// Probe one tool.
pub async fn probe_tool<R: ProcessRunner>(runner: &R, tool: &RequiredTool) -> DependencyStatus {
    let invocation = Invocation::new(tool.program.clone(), ["--version"]);

    let (found, version) = match runner.run(&invocation).await {
        Ok(outcome) if outcome.success() => {
            let version = first_line(&outcome.stdout).or_else(|| first_line(&outcome.stderr));
            (true, version)
        }
        Ok(outcome) => {
            match outcome.exit {
                ExitState::TimedOut { .. } => warn!("{} --version timed out", tool.name),
                _ => debug!("{} --version exited with {:?}", tool.name, outcome.exit),
            }
            (true, None)
        }
        Err(e) => {
            debug!("{} could not be started: {e}", tool.name);
            (false, None)
        }
    };

    DependencyStatus {
        name: tool.name.clone(),
        found,
        version,
        path: which::which(&tool.program).ok(),
        required: tool.required,
        hint: (!found).then(|| tool.hint.clone()),
    }
}

/// Probe every tool in `tools`, in order.
///
/// Never fails: an unreachable tool is reported with `found: false`.
pub async fn probe_dependencies<R: ProcessRunner>(
    runner: &R,
    tools: &ToolSet,
    progress: Option<&ProgressCallback>,
) -> Vec<DependencyStatus> {
    let mut statuses = Vec::with_capacity(tools.tools.len());
    for tool in &tools.tools {
        let status = probe_tool(runner, tool).await;
        debug!(
            "Probe {}: found={} version={:?}",
            status.name, status.found, status.version
        );
        if let Some(cb) = progress {
            cb.on_probe(&status.name, status.found);
        }
        statuses.push(status);
    }
    statuses
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
