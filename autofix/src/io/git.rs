//! Git adapter for the remediation loop.
//!
//! The fixer and the commit/push stage share one working tree. [`Repository`]
//! is the single handle both receive, so the shared resource is explicit
//! rather than implied by the process working directory.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::process::{ProcessLimits, ProcessOutput, run_command};

/// Length of the short revision form searched for in deployment metadata.
pub const SHORT_REVISION_LEN: usize = 7;

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Version-control operations the loop performs on the working tree.
pub trait Repository {
    /// Current HEAD revision, short (7 chars) or full.
    fn current_revision(&self, short: bool) -> Result<String>;

    /// True if there are unstaged or staged changes to tracked files.
    fn is_dirty(&self) -> Result<bool>;

    /// Paths with uncommitted changes (including untracked), for reporting.
    fn changed_paths(&self) -> Result<Vec<String>>;

    /// Stage every working-tree change.
    fn stage_all(&self) -> Result<()>;

    /// Attempt a commit. A non-zero status is returned, not raised.
    fn commit(&self, message: &str) -> Result<ProcessOutput>;

    /// Attempt a push. A non-zero status is returned, not raised.
    fn push(&self, remote: &str, branch: &str) -> Result<ProcessOutput>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    limits: ProcessLimits,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            limits: ProcessLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ProcessLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Get status entries (including untracked) in porcelain format.
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let out = self.run_capture(&["status", "--porcelain=v1", "-uall"])?;
        let mut entries = Vec::new();
        for line in out.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_status_line(line)?);
        }
        Ok(entries)
    }

    /// `git diff --quiet` style probe: exit 0 is clean, exit 1 is dirty.
    fn diff_is_dirty(&self, args: &[&str]) -> Result<bool> {
        let output = self.run(args)?;
        match output.exit_code {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr.trim()
            )),
        }
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(output.stdout)
    }

    fn run_checked(&self, args: &[&str]) -> Result<ProcessOutput> {
        let output = self.run(args)?;
        if !output.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr.trim()
            ));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<ProcessOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        run_command(cmd, None, self.limits)
    }
}

impl Repository for Git {
    fn current_revision(&self, short: bool) -> Result<String> {
        let short_arg = format!("--short={SHORT_REVISION_LEN}");
        let mut args = vec!["rev-parse"];
        if short {
            args.push(&short_arg);
        }
        args.push("HEAD");
        let out = self.run_capture(&args)?;
        let revision = out.trim().to_string();
        if revision.is_empty() {
            return Err(anyhow!("git rev-parse returned an empty revision"));
        }
        Ok(revision)
    }

    #[instrument(skip_all)]
    fn is_dirty(&self) -> Result<bool> {
        let dirty = self.diff_is_dirty(&["diff", "--quiet"])?
            || self.diff_is_dirty(&["diff", "--cached", "--quiet"])?;
        debug!(dirty, "working tree probed");
        Ok(dirty)
    }

    fn changed_paths(&self) -> Result<Vec<String>> {
        Ok(self
            .status_porcelain()?
            .into_iter()
            .map(|entry| entry.path)
            .collect())
    }

    /// Stage all changes (respects .gitignore).
    fn stage_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn commit(&self, message: &str) -> Result<ProcessOutput> {
        debug!("committing staged changes");
        let output = self.run(&["commit", "-m", message])?;
        if !output.success() {
            warn!(exit_code = ?output.exit_code, "git commit returned non-zero");
        }
        Ok(output)
    }

    #[instrument(skip_all, fields(%remote, %branch))]
    fn push(&self, remote: &str, branch: &str) -> Result<ProcessOutput> {
        debug!("pushing");
        self.run(&["push", remote, branch])
    }
}

fn parse_status_line(line: &str) -> Result<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Ok(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 {
        return Err(anyhow!("unexpected porcelain line: '{line}'"));
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Ok(StatusEntry { code, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;
    use std::fs;

    #[test]
    fn parses_untracked_line() {
        let e = parse_status_line("?? foo.txt").expect("parse");
        assert_eq!(
            e,
            StatusEntry {
                code: "??".to_string(),
                path: "foo.txt".to_string()
            }
        );
    }

    #[test]
    fn parses_rename_line_uses_new_path() {
        let e = parse_status_line("R  old.txt -> new.txt").expect("parse");
        assert_eq!(e.path, "new.txt");
    }

    #[test]
    fn short_revision_is_prefix_of_full() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        let short = git.current_revision(true).expect("short");
        let full = git.current_revision(false).expect("full");
        assert_eq!(short.len(), SHORT_REVISION_LEN);
        assert!(full.starts_with(&short));
    }

    #[test]
    fn dirtiness_tracks_unstaged_and_staged_edits() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        assert!(!git.is_dirty().expect("clean"));

        fs::write(repo.path().join("README.md"), "edited\n").expect("edit");
        assert!(git.is_dirty().expect("unstaged"));

        git.stage_all().expect("stage");
        assert!(git.is_dirty().expect("staged"));
        assert_eq!(git.changed_paths().expect("paths"), vec!["README.md"]);
    }

    #[test]
    fn untracked_files_do_not_count_as_dirty() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        fs::write(repo.path().join("new.txt"), "new\n").expect("write");
        assert!(!git.is_dirty().expect("probe"));
        assert_eq!(git.changed_paths().expect("paths"), vec!["new.txt"]);
    }

    #[test]
    fn empty_commit_reports_nothing_to_commit() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        git.stage_all().expect("stage");
        let output = git.commit("chore: empty").expect("commit");
        assert!(!output.success());
        assert!(
            output
                .combined()
                .to_lowercase()
                .contains("nothing to commit")
        );
    }
}
