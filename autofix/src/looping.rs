//! Multi-iteration remediation loop for `autofix run`.
//!
//! Each iteration runs the stages strictly in order: fetch logs for HEAD,
//! classify them, run the fixer, commit and push, then wait for the platform
//! to build the push. The iteration counter is the only state carried across
//! iterations.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::core::classifier::classify;
use crate::core::types::{BuildVerdict, FixOutcome, LoopStop, PushOutcome};
use crate::fix::attempt_fix;
use crate::io::config::AutofixConfig;
use crate::io::fixer::Fixer;
use crate::io::git::Repository;
use crate::io::process::ProcessOutput;
use crate::io::vercel::DeploymentPlatform;
use crate::locate::{LocatedDeployment, fetch_build_logs};
use crate::publish::commit_and_push;

/// Number of trailing log lines carried in [`LoopEvent::LogsFetched`].
const LOG_TAIL_LINES: usize = 15;

/// Blocking pause between iterations.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeper that blocks the current thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Immutable loop parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    pub max_iterations: u32,
    /// Pause after a push, and after a round where no logs were found.
    pub sleep_after_push: Duration,
    pub remote: String,
    pub branch: String,
}

impl LoopSettings {
    pub fn from_config(config: &AutofixConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            sleep_after_push: config.sleep_after_push(),
            remote: config.git_remote.clone(),
            branch: config.git_branch.clone(),
        }
    }
}

/// Collaborators the loop drives. All of them share the one working tree
/// behind `repo`.
pub struct LoopStages<'a, P, R, F, S> {
    pub platform: &'a P,
    pub repo: &'a R,
    pub fixer: &'a F,
    pub sleeper: &'a S,
}

/// Progress notification emitted while the loop runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    IterationStarted {
        iter: u32,
        max_iterations: u32,
    },
    /// No deployment or no logs for HEAD yet; the loop waits and moves on.
    LogsUnavailable {
        iter: u32,
        wait: Option<Duration>,
    },
    LogsFetched {
        iter: u32,
        deployment: LocatedDeployment,
        tail: String,
    },
    Classified {
        iter: u32,
        verdict: BuildVerdict,
    },
    FixAttempted {
        iter: u32,
        outcome: FixOutcome,
        changed_paths: Vec<String>,
        /// Captured fixer output, when the fixer ran.
        output: Option<ProcessOutput>,
    },
    Published {
        iter: u32,
        outcome: PushOutcome,
    },
    Waiting {
        iter: u32,
        duration: Duration,
    },
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Iteration during which the loop stopped.
    pub iterations: u32,
    pub stop: LoopStop,
}

/// Run the remediation loop until the build is healthy, the fixer stops making
/// progress, or `max_iterations` iterations have run.
///
/// Clean terminations return `Ok`. Errors are reserved for failures the loop
/// cannot reason past: git probes, and commit/push failures
/// ([`crate::publish::PublishError`]).
#[instrument(skip_all, fields(max_iterations = settings.max_iterations))]
pub fn run_loop<P, R, F, S, E>(
    stages: &LoopStages<'_, P, R, F, S>,
    settings: &LoopSettings,
    mut on_event: E,
) -> Result<LoopOutcome>
where
    P: DeploymentPlatform,
    R: Repository,
    F: Fixer,
    S: Sleeper,
    E: FnMut(&LoopEvent),
{
    let max = settings.max_iterations;
    for iter in 1..=max {
        on_event(&LoopEvent::IterationStarted {
            iter,
            max_iterations: max,
        });
        // No pause after the final iteration: nothing would observe it.
        let wait = (iter < max).then_some(settings.sleep_after_push);

        let Some(logs) = fetch_build_logs(stages.platform, stages.repo)? else {
            on_event(&LoopEvent::LogsUnavailable { iter, wait });
            if let Some(duration) = wait {
                stages.sleeper.sleep(duration);
            }
            continue;
        };
        on_event(&LoopEvent::LogsFetched {
            iter,
            deployment: logs.deployment.clone(),
            tail: log_tail(&logs.text, LOG_TAIL_LINES),
        });

        let verdict = classify(&logs.text);
        debug!(iter, %verdict, "classified build logs");
        on_event(&LoopEvent::Classified { iter, verdict });
        if verdict == BuildVerdict::Success {
            return Ok(stopped(iter, LoopStop::BuildHealthy));
        }

        let report = attempt_fix(stages.fixer, stages.repo, &logs.text)?;
        on_event(&LoopEvent::FixAttempted {
            iter,
            outcome: report.outcome,
            changed_paths: report.changed_paths,
            output: report.output,
        });
        if report.outcome != FixOutcome::Changed {
            return Ok(stopped(
                iter,
                LoopStop::NoFurtherChanges {
                    outcome: report.outcome,
                },
            ));
        }

        let pushed = commit_and_push(stages.repo, &settings.remote, &settings.branch)?;
        on_event(&LoopEvent::Published {
            iter,
            outcome: pushed,
        });
        if pushed == PushOutcome::NothingToCommit {
            return Ok(stopped(iter, LoopStop::NothingToPush));
        }

        if let Some(duration) = wait {
            on_event(&LoopEvent::Waiting { iter, duration });
            stages.sleeper.sleep(duration);
        }
    }

    info!(max_iterations = max, "iteration budget exhausted");
    Ok(stopped(
        max,
        LoopStop::BudgetExhausted {
            max_iterations: max,
        },
    ))
}

fn stopped(iterations: u32, stop: LoopStop) -> LoopOutcome {
    info!(iterations, %stop, "loop stopped");
    LoopOutcome { iterations, stop }
}

/// Last `lines` lines of `text`.
fn log_tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
