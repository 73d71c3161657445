//! Vercel CLI adapter.
//!
//! Only the read-only `vercel list` and `vercel inspect` subcommands are used.
//! Both print human tables, so parsing lives in `core::deployments`.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::io::config::AutofixConfig;
use crate::io::process::{ProcessLimits, ProcessOutput, run_command};

/// Read-only view of the deployment platform.
pub trait DeploymentPlatform {
    /// List known deployments as the platform's textual table.
    fn list_deployments(&self) -> Result<ProcessOutput>;

    /// Inspect one deployment including its build logs. With `wait`, block
    /// until the deployment reaches a final state.
    fn inspect_deployment(&self, id: &str, wait: bool) -> Result<ProcessOutput>;
}

/// Platform implementation that shells out to the `vercel` CLI.
#[derive(Debug, Clone)]
pub struct VercelCli {
    program: String,
    workdir: PathBuf,
    token: Option<String>,
    team_id: Option<String>,
    limits: ProcessLimits,
}

impl VercelCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: "vercel".to_string(),
            workdir: workdir.into(),
            token: None,
            team_id: None,
            limits: ProcessLimits::default(),
        }
    }

    pub fn from_config(config: &AutofixConfig) -> Self {
        Self {
            token: config.vercel_token.clone(),
            team_id: config.vercel_team_id.clone(),
            limits: config.process_limits(),
            ..Self::new(&config.repo_path)
        }
    }

    /// Override the executable (used by tests to point at a stub script).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).current_dir(&self.workdir);
        if let Some(token) = non_empty(self.token.as_deref()) {
            cmd.arg("--token").arg(token);
            cmd.env("VERCEL_AUTH_TOKEN", token);
        }
        if let Some(team) = non_empty(self.team_id.as_deref()) {
            cmd.arg("--scope").arg(team);
            cmd.env("VERCEL_TEAM_ID", team);
        }
        cmd
    }
}

impl DeploymentPlatform for VercelCli {
    #[instrument(skip_all)]
    fn list_deployments(&self) -> Result<ProcessOutput> {
        debug!("listing deployments");
        run_command(self.command(&["list"]), None, self.limits).context("run vercel list")
    }

    #[instrument(skip_all, fields(%id, wait = wait))]
    fn inspect_deployment(&self, id: &str, wait: bool) -> Result<ProcessOutput> {
        let mut args = vec!["inspect", id, "--logs"];
        if wait {
            args.push("--wait");
        }
        debug!("inspecting deployment");
        run_command(self.command(&args), None, self.limits)
            .with_context(|| format!("run vercel inspect {id}"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::write_stub_script;

    #[test]
    fn passes_token_and_scope_to_cli() {
        let temp = tempfile::tempdir().expect("tempdir");
        let stub = write_stub_script(
            temp.path(),
            "vercel",
            "echo \"args: $*\"\necho \"env: $VERCEL_AUTH_TOKEN $VERCEL_TEAM_ID\" >&2\n",
        )
        .expect("stub");
        let mut cli = VercelCli::new(temp.path()).with_program(stub.display().to_string());
        cli.token = Some("tok".to_string());
        cli.team_id = Some("team_1".to_string());

        let output = cli.inspect_deployment("dpl_123", true).expect("inspect");
        assert_eq!(
            output.stdout.trim(),
            "args: inspect dpl_123 --logs --wait --token tok --scope team_1"
        );
        assert_eq!(output.stderr.trim(), "env: tok team_1");
    }

    #[test]
    fn blank_credentials_are_not_forwarded() {
        let temp = tempfile::tempdir().expect("tempdir");
        let stub = write_stub_script(temp.path(), "vercel", "echo \"args: $*\"\n").expect("stub");
        let mut cli = VercelCli::new(temp.path()).with_program(stub.display().to_string());
        cli.token = Some("  ".to_string());

        let output = cli.list_deployments().expect("list");
        assert_eq!(output.stdout.trim(), "args: list");
    }
}
