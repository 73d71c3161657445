//! Fixer abstraction for agent invocation.
//!
//! The [`Fixer`] trait decouples the fix stage from the actual agent backend
//! (by default `codex exec`). Tests use scripted fixers that return
//! predetermined outputs without spawning processes.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Result, anyhow};
use tracing::{info, instrument, warn};

use crate::io::config::AutofixConfig;
use crate::io::process::{ProcessLimits, ProcessOutput, program_on_path, run_command};

/// Output fragment printed by agents that refuse to run without a TTY.
const NEEDS_TERMINAL_MARKER: &str = "stdin is not a terminal";

/// Program used to give the fixer a pseudo-terminal.
const PTY_WRAPPER: &str = "script";

/// Result of one blocking fixer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixerRun {
    /// The fixer ran to completion (successfully or not).
    Completed(ProcessOutput),
    /// The fixer demanded a terminal and no pseudo-terminal wrapper exists.
    TerminalUnavailable,
}

/// Abstraction over fixer backends.
pub trait Fixer {
    /// Run the fixer with `task` as its input. Blocks until the fixer exits.
    fn run(&self, task: &str) -> Result<FixerRun>;
}

/// Fixer that spawns a configured command in the repository, task on stdin.
#[derive(Debug, Clone)]
pub struct CommandFixer {
    command: Vec<String>,
    workdir: PathBuf,
    limits: ProcessLimits,
    pty_wrapper: Option<String>,
}

impl CommandFixer {
    pub fn new(command: Vec<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            workdir: workdir.into(),
            limits: ProcessLimits::default(),
            pty_wrapper: program_on_path(PTY_WRAPPER).then(|| PTY_WRAPPER.to_string()),
        }
    }

    pub fn from_config(config: &AutofixConfig) -> Self {
        Self {
            limits: config.process_limits(),
            ..Self::new(config.fixer_command.clone(), &config.repo_path)
        }
    }

    /// Override the pseudo-terminal wrapper (`None` disables the retry).
    pub fn with_pty_wrapper(mut self, wrapper: Option<String>) -> Self {
        self.pty_wrapper = wrapper;
        self
    }

    fn invoke(&self, argv: &[String], task: &str) -> Result<ProcessOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("fixer command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&self.workdir);
        run_command(cmd, Some(task.as_bytes()), self.limits)
    }

    /// `script -q /dev/null <cmd…>`: allocates a pty and discards the typescript.
    fn wrapped_argv(&self, wrapper: &str) -> Vec<String> {
        let mut argv = vec![wrapper.to_string(), "-q".to_string(), "/dev/null".to_string()];
        argv.extend(self.command.iter().cloned());
        argv
    }
}

impl Fixer for CommandFixer {
    #[instrument(skip_all, fields(program = self.command.first().map(String::as_str)))]
    fn run(&self, task: &str) -> Result<FixerRun> {
        let output = self.invoke(&self.command, task)?;
        if output.success() || !needs_terminal(&output) {
            return Ok(FixerRun::Completed(output));
        }

        let Some(wrapper) = self.pty_wrapper.as_deref() else {
            warn!("fixer requires a TTY but no pseudo-terminal wrapper is available");
            return Ok(FixerRun::TerminalUnavailable);
        };
        info!(wrapper, "fixer requires a TTY; retrying under a pseudo-terminal");
        let output = self.invoke(&self.wrapped_argv(wrapper), task)?;
        Ok(FixerRun::Completed(output))
    }
}

fn needs_terminal(output: &ProcessOutput) -> bool {
    output
        .combined()
        .to_lowercase()
        .contains(NEEDS_TERMINAL_MARKER)
}
