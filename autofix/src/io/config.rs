//! Loop configuration: defaults, optional `autofix.toml`, `.env`, and environment.
//!
//! The configuration is read once at startup and then passed by reference into
//! every component constructor. Nothing below the binary reads the process
//! environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::process::ProcessLimits;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "autofix.toml";

/// Configuration problems the binary reports with a dedicated exit code.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("repo_path {} is not a directory", path.display())]
    MissingRepo { path: PathBuf },
    #[error("{0}")]
    Invalid(&'static str),
}

/// Loop configuration (TOML).
///
/// Missing fields default to the values the loop was tuned with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutofixConfig {
    /// Repository the loop fixes, commits, and pushes.
    pub repo_path: PathBuf,

    /// Production URL. Informational only.
    pub prod_url: Option<String>,

    pub git_remote: String,
    pub git_branch: String,

    /// Vercel access token forwarded to the CLI.
    pub vercel_token: Option<String>,

    /// Vercel team/organization scope.
    pub vercel_team_id: Option<String>,

    /// Fixer argv. The task is written to its stdin.
    pub fixer_command: Vec<String>,

    /// Upper bound on loop iterations.
    pub max_iterations: u32,

    /// Seconds to sleep after a push (and after a round with no logs).
    pub sleep_after_push_secs: u64,

    /// Kill any external command running longer than this. Unset waits forever.
    pub command_timeout_secs: Option<u64>,

    /// Bytes of stdout/stderr kept per external command.
    pub output_limit_bytes: usize,
}

impl Default for AutofixConfig {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            prod_url: None,
            git_remote: "origin".to_string(),
            git_branch: "main".to_string(),
            vercel_token: None,
            vercel_team_id: None,
            fixer_command: ["codex", "exec", "--full-auto", "--sandbox", "workspace-write", "-"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_iterations: 10,
            sleep_after_push_secs: 90,
            command_timeout_secs: None,
            output_limit_bytes: 4 * 1024 * 1024,
        }
    }
}

impl AutofixConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid("max_iterations must be > 0").into());
        }
        if self.fixer_command.is_empty() || self.fixer_command[0].trim().is_empty() {
            return Err(ConfigError::Invalid("fixer_command must be a non-empty array").into());
        }
        if self.git_remote.trim().is_empty() || self.git_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("git_remote and git_branch must be set").into());
        }
        if self.command_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("command_timeout_secs must be > 0 when set").into());
        }
        if self.output_limit_bytes == 0 {
            return Err(ConfigError::Invalid("output_limit_bytes must be > 0").into());
        }
        Ok(())
    }

    pub fn sleep_after_push(&self) -> Duration {
        Duration::from_secs(self.sleep_after_push_secs)
    }

    pub fn process_limits(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: self.command_timeout_secs.map(Duration::from_secs),
            output_limit_bytes: self.output_limit_bytes,
        }
    }

    /// Copy safe to print: the access token is masked.
    pub fn redacted(&self) -> Self {
        Self {
            vercel_token: self.vercel_token.as_ref().map(|_| "***".to_string()),
            ..self.clone()
        }
    }

    /// Overlay variables from `lookup` (usually the process environment).
    ///
    /// Variable names match the ones the loop has always used, e.g.
    /// `REPO_PATH`, `CODEX_CMD`, `MAX_ITERATIONS`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("REPO_PATH") {
            self.repo_path = PathBuf::from(v);
        }
        if let Some(v) = get("PROD_URL") {
            self.prod_url = Some(v);
        }
        if let Some(v) = get("GIT_REMOTE") {
            self.git_remote = v;
        }
        if let Some(v) = get("GIT_BRANCH") {
            self.git_branch = v;
        }
        if let Some(v) = get("VERCEL_TOKEN") {
            self.vercel_token = Some(v);
        }
        if let Some(v) = get("VERCEL_TEAM_ID") {
            self.vercel_team_id = Some(v);
        }
        if let Some(v) = get("CODEX_CMD") {
            self.fixer_command = v.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = get("MAX_ITERATIONS") {
            self.max_iterations = parse_number("MAX_ITERATIONS", &v)?;
        }
        if let Some(v) = get("SLEEP_AFTER_PUSH_SECONDS") {
            self.sleep_after_push_secs = parse_number("SLEEP_AFTER_PUSH_SECONDS", &v)?;
        }
        if let Some(v) = get("COMMAND_TIMEOUT_SECONDS") {
            self.command_timeout_secs = Some(parse_number("COMMAND_TIMEOUT_SECONDS", &v)?);
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        anyhow::Error::from(ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        })
    })
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AutofixConfig::default()`. The result is
/// not validated; callers apply overrides first.
pub fn load_config_file(path: &Path) -> Result<AutofixConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config file missing, using defaults");
        return Ok(AutofixConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AutofixConfig = toml::from_str(&contents).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(cfg)
}

/// Resolve the effective configuration: file, then `lookup` overrides, then
/// validation and repo path resolution.
pub fn resolve_config<F>(path: &Path, lookup: F) -> Result<AutofixConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = load_config_file(path)?;
    cfg.apply_env(lookup)?;
    cfg.validate()?;
    cfg.repo_path = resolve_repo_path(&cfg.repo_path)?;
    Ok(cfg)
}

fn resolve_repo_path(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(ConfigError::MissingRepo {
            path: path.to_path_buf(),
        }
        .into());
    }
    fs::canonicalize(path).with_context(|| format!("canonicalize {}", path.display()))
}
