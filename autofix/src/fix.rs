//! The fix stage: hand failing logs to the fixer and detect whether it edited
//! the working tree.
//!
//! Change detection compares tree dirtiness before and after the run. It cannot
//! tell the fixer's edits apart from edits that were already uncommitted; a
//! tree that was dirty beforehand always counts as changed.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::task::render_fix_task;
use crate::core::types::FixOutcome;
use crate::io::fixer::{Fixer, FixerRun};
use crate::io::git::Repository;
use crate::io::process::ProcessOutput;

/// Sentinel a fixer may print on stdout to report that it had nothing to change.
pub const NO_CHANGES_SENTINEL: &str = "NO_CHANGES";

/// Details of one fix attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixReport {
    pub outcome: FixOutcome,
    /// Captured fixer output, when the fixer ran.
    pub output: Option<ProcessOutput>,
    /// Paths with uncommitted changes after the run (only for `Changed`).
    pub changed_paths: Vec<String>,
}

impl FixReport {
    fn without_output(outcome: FixOutcome) -> Self {
        Self {
            outcome,
            output: None,
            changed_paths: Vec::new(),
        }
    }
}

/// Invoke the fixer on `logs` and classify the result.
///
/// Fixer failures never abort the loop: a non-zero exit is `NoChange` and a
/// fixer that cannot be run is `AgentError`. Only working-tree probe failures
/// propagate.
#[instrument(skip_all, fields(log_bytes = logs.len()))]
pub fn attempt_fix<F, R>(fixer: &F, repo: &R, logs: &str) -> Result<FixReport>
where
    F: Fixer,
    R: Repository,
{
    if logs.trim().is_empty() {
        info!("no logs to hand to the fixer");
        return Ok(FixReport::without_output(FixOutcome::NoChange));
    }

    let dirty_before = repo.is_dirty()?;
    let task = render_fix_task(logs)?;

    let output = match fixer.run(&task) {
        Ok(FixerRun::Completed(output)) => output,
        Ok(FixerRun::TerminalUnavailable) => {
            warn!("fixer needs a terminal that cannot be provided");
            return Ok(FixReport::without_output(FixOutcome::AgentError));
        }
        Err(err) => {
            warn!("fixer could not be run: {err:#}");
            return Ok(FixReport::without_output(FixOutcome::AgentError));
        }
    };

    if !output.success() {
        warn!(
            exit_code = ?output.exit_code,
            timed_out = output.timed_out,
            "fixer exited unsuccessfully, treating as no changes:\n{}",
            output.describe()
        );
        return Ok(FixReport {
            outcome: FixOutcome::NoChange,
            output: Some(output),
            changed_paths: Vec::new(),
        });
    }

    if output.stdout.to_uppercase().contains(NO_CHANGES_SENTINEL) {
        info!("fixer reports no changes needed");
        return Ok(FixReport {
            outcome: FixOutcome::NoChange,
            output: Some(output),
            changed_paths: Vec::new(),
        });
    }

    let dirty_after = repo.is_dirty()?;
    if !dirty_before && !dirty_after {
        info!("fixer made no file changes");
        return Ok(FixReport {
            outcome: FixOutcome::NoChange,
            output: Some(output),
            changed_paths: Vec::new(),
        });
    }

    let changed_paths = repo.changed_paths()?;
    info!(
        dirty_before,
        changed = changed_paths.len(),
        "fixer appears to have modified the repository"
    );
    Ok(FixReport {
        outcome: FixOutcome::Changed,
        output: Some(output),
        changed_paths,
    })
}
