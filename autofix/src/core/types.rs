//! Shared deterministic types for the remediation loop.
//!
//! These types define stable contracts between the loop stages. They carry no
//! identity and no I/O handles, so every stage can be tested in isolation.

use std::fmt;

/// Classifier judgment over a build/deploy log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildVerdict {
    /// The log carries an explicit completion marker and no failure marker.
    Success,
    /// The log carries at least one failure marker.
    Failure,
    /// Neither marker set matched. Never treated as success.
    Ambiguous,
}

impl BuildVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildVerdict::Success => "success",
            BuildVerdict::Failure => "failure",
            BuildVerdict::Ambiguous => "ambiguous",
        }
    }
}

impl fmt::Display for BuildVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one fixer invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    /// The working tree is dirty after the fixer ran.
    Changed,
    /// Nothing to hand to the fixer, the fixer failed, or the tree stayed clean.
    NoChange,
    /// The fixer could not be run at all (spawn failure, missing terminal).
    AgentError,
}

/// Result of the commit/push stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    NothingToCommit,
}

/// Reason why the loop terminated cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// The classifier reported success for the current revision.
    BuildHealthy,
    /// The fixer made no changes or could not run.
    NoFurtherChanges { outcome: FixOutcome },
    /// The fixer touched files but the commit was empty.
    NothingToPush,
    /// Every iteration slot was used without reaching another stop reason.
    BudgetExhausted { max_iterations: u32 },
}

impl fmt::Display for LoopStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopStop::BuildHealthy => f.write_str("build healthy"),
            LoopStop::NoFurtherChanges { .. } => f.write_str("no further changes available"),
            LoopStop::NothingToPush => f.write_str("no changes to push"),
            LoopStop::BudgetExhausted { max_iterations } => {
                write!(f, "iteration budget exhausted ({max_iterations})")
            }
        }
    }
}
