//! Test-only scripted collaborators and scratch repositories.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};

use crate::io::fixer::{Fixer, FixerRun};
use crate::io::git::Repository;
use crate::io::process::ProcessOutput;
use crate::io::vercel::DeploymentPlatform;
use crate::looping::Sleeper;

/// Platform that serves a fixed listing and per-id inspection output.
pub struct ScriptedPlatform {
    listing: ProcessOutput,
    inspections: HashMap<String, ProcessOutput>,
    inspected: RefCell<Vec<(String, bool)>>,
}

impl ScriptedPlatform {
    pub fn new(listing: ProcessOutput) -> Self {
        Self {
            listing,
            inspections: HashMap::new(),
            inspected: RefCell::new(Vec::new()),
        }
    }

    /// Output returned for `id`. Unscripted ids inspect to empty output.
    pub fn with_inspection(mut self, id: &str, output: ProcessOutput) -> Self {
        self.inspections.insert(id.to_string(), output);
        self
    }

    /// Every `(id, wait)` inspection in call order.
    pub fn inspected(&self) -> Vec<(String, bool)> {
        self.inspected.borrow().clone()
    }
}

impl DeploymentPlatform for ScriptedPlatform {
    fn list_deployments(&self) -> Result<ProcessOutput> {
        Ok(self.listing.clone())
    }

    fn inspect_deployment(&self, id: &str, wait: bool) -> Result<ProcessOutput> {
        self.inspected.borrow_mut().push((id.to_string(), wait));
        Ok(self
            .inspections
            .get(id)
            .cloned()
            .unwrap_or_else(|| ProcessOutput::exited(0, "", "")))
    }
}

/// Platform whose listing contains exactly one deployment, `id`.
pub fn single_deployment_listing(id: &str) -> ScriptedPlatform {
    let table = format!("Deployment   Age   Status\n{id}   1m   Ready\n");
    ScriptedPlatform::new(ProcessOutput::exited(0, table, ""))
}

/// Mutating repository operations recorded by [`ScriptedRepo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    StageAll,
    Commit(String),
    Push(String, String),
}

/// Repository with scripted revisions, dirtiness probes, and commit/push results.
///
/// HEAD starts at the first revision and advances on every successful push.
pub struct ScriptedRepo {
    revisions: Vec<String>,
    head: Cell<usize>,
    dirty: RefCell<VecDeque<bool>>,
    dirty_probes: Cell<usize>,
    changed_paths: Vec<String>,
    commit_outputs: RefCell<VecDeque<ProcessOutput>>,
    push_outputs: RefCell<VecDeque<ProcessOutput>>,
    calls: RefCell<Vec<RepoCall>>,
}

impl ScriptedRepo {
    pub fn new<I, S>(revisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            revisions: revisions.into_iter().map(Into::into).collect(),
            head: Cell::new(0),
            dirty: RefCell::new(VecDeque::new()),
            dirty_probes: Cell::new(0),
            changed_paths: Vec::new(),
            commit_outputs: RefCell::new(VecDeque::new()),
            push_outputs: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Results of successive `is_dirty` probes; clean once exhausted.
    pub fn with_dirty(self, probes: impl IntoIterator<Item = bool>) -> Self {
        self.dirty.borrow_mut().extend(probes);
        self
    }

    pub fn with_changed_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changed_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Results of successive commits; successful once exhausted.
    pub fn with_commit_outputs(self, outputs: impl IntoIterator<Item = ProcessOutput>) -> Self {
        self.commit_outputs.borrow_mut().extend(outputs);
        self
    }

    /// Results of successive pushes; successful once exhausted.
    pub fn with_push_outputs(self, outputs: impl IntoIterator<Item = ProcessOutput>) -> Self {
        self.push_outputs.borrow_mut().extend(outputs);
        self
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.calls.borrow().clone()
    }

    pub fn dirty_probes(&self) -> usize {
        self.dirty_probes.get()
    }

    /// Short revision HEAD currently points at.
    pub fn head(&self) -> Option<&str> {
        self.revisions.get(self.head.get()).map(String::as_str)
    }
}

impl Repository for ScriptedRepo {
    fn current_revision(&self, short: bool) -> Result<String> {
        let revision = self
            .head()
            .ok_or_else(|| anyhow!("scripted repo has no revisions"))?;
        if short {
            Ok(revision.to_string())
        } else {
            Ok(format!("{revision:0<40}"))
        }
    }

    fn is_dirty(&self) -> Result<bool> {
        self.dirty_probes.set(self.dirty_probes.get() + 1);
        Ok(self.dirty.borrow_mut().pop_front().unwrap_or(false))
    }

    fn changed_paths(&self) -> Result<Vec<String>> {
        Ok(self.changed_paths.clone())
    }

    fn stage_all(&self) -> Result<()> {
        self.calls.borrow_mut().push(RepoCall::StageAll);
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<ProcessOutput> {
        self.calls
            .borrow_mut()
            .push(RepoCall::Commit(message.to_string()));
        Ok(self
            .commit_outputs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| ProcessOutput::exited(0, "[main 0000000] auto-fix\n", "")))
    }

    fn push(&self, remote: &str, branch: &str) -> Result<ProcessOutput> {
        self.calls
            .borrow_mut()
            .push(RepoCall::Push(remote.to_string(), branch.to_string()));
        let output = self
            .push_outputs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| ProcessOutput::exited(0, "", ""));
        if output.success() {
            let last = self.revisions.len().saturating_sub(1);
            self.head.set((self.head.get() + 1).min(last));
        }
        Ok(output)
    }
}

/// Fixer that replays queued results and records every task it receives.
pub struct ScriptedFixer {
    runs: RefCell<VecDeque<Result<FixerRun>>>,
    tasks: RefCell<Vec<String>>,
}

impl ScriptedFixer {
    pub fn new(runs: Vec<Result<FixerRun>>) -> Self {
        Self {
            runs: RefCell::new(runs.into()),
            tasks: RefCell::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn tasks(&self) -> Vec<String> {
        self.tasks.borrow().clone()
    }
}

impl Fixer for ScriptedFixer {
    fn run(&self, task: &str) -> Result<FixerRun> {
        self.tasks.borrow_mut().push(task.to_string());
        self.runs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("scripted fixer has no runs left")))
    }
}

/// Sleeper that records durations instead of blocking.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

/// Scratch git repository on `main` with one committed `README.md`.
pub struct TestRepo {
    dir: tempfile::TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("tempdir")?;
        let root = dir.path();
        run_git(root, &["init", "-q"])?;
        run_git(root, &["checkout", "-q", "-b", "main"])?;
        run_git(root, &["config", "user.name", "Autofix Test"])?;
        run_git(root, &["config", "user.email", "autofix-test@local.invalid"])?;
        run_git(root, &["config", "commit.gpgsign", "false"])?;
        fs::write(root.join("README.md"), "seed\n").context("write README.md")?;
        run_git(root, &["add", "-A"])?;
        run_git(root, &["commit", "-q", "-m", "chore: seed"])?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a bare repository inside the scratch dir and register it as `name`.
    pub fn add_bare_remote(&self, name: &str) -> Result<PathBuf> {
        let remote = self.path().join(".remotes").join(format!("{name}.git"));
        fs::create_dir_all(&remote).with_context(|| format!("create {}", remote.display()))?;
        run_git(&remote, &["init", "-q", "--bare"])?;
        let remote_str = remote.display().to_string();
        run_git(self.path(), &["remote", "add", name, &remote_str])?;
        // Keep the remote out of the working tree status.
        fs::write(self.path().join(".git").join("info").join("exclude"), ".remotes/\n")
            .context("write exclude")?;
        Ok(remote)
    }

    /// Run git in the scratch repository and return stdout.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        run_git(self.path(), args)
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Write an executable `#!/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_stub_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}"))
        .with_context(|| format!("write {}", path.display()))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("chmod {}", path.display()))?;
    Ok(path)
}
