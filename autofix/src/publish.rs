//! Commit and push of fixer edits.
//!
//! Failures here are fatal to the run: a commit or push that failed for an
//! unknown reason leaves the local and remote trees in a state the loop cannot
//! reason about, so nothing is retried.

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::types::PushOutcome;
use crate::io::git::Repository;
use crate::io::process::ProcessOutput;

/// Message used for every automated commit.
pub const COMMIT_MESSAGE: &str = "chore: auto-fix by codex based on Vercel build logs";

const NOTHING_TO_COMMIT: &str = "nothing to commit";

/// Fatal commit/push failure, carrying both captured streams.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("git commit failed unexpectedly:\n{}", .0.describe())]
    Commit(ProcessOutput),
    #[error("git push to {remote}/{branch} failed:\n{}", .output.describe())]
    Push {
        remote: String,
        branch: String,
        output: ProcessOutput,
    },
}

/// Stage everything, commit with [`COMMIT_MESSAGE`], and push to
/// `remote`/`branch`.
///
/// An empty commit is [`PushOutcome::NothingToCommit`]; every other commit or
/// push failure is a [`PublishError`].
#[instrument(skip_all, fields(%remote, %branch))]
pub fn commit_and_push<R: Repository>(
    repo: &R,
    remote: &str,
    branch: &str,
) -> Result<PushOutcome> {
    repo.stage_all()?;

    let commit = repo.commit(COMMIT_MESSAGE)?;
    if !commit.success() {
        if commit.combined().to_lowercase().contains(NOTHING_TO_COMMIT) {
            info!("nothing to commit, skipping push");
            return Ok(PushOutcome::NothingToCommit);
        }
        return Err(PublishError::Commit(commit).into());
    }
    info!(summary = %commit.stdout.lines().next().unwrap_or_default(), "commit created");

    let push = repo.push(remote, branch)?;
    if !push.success() {
        return Err(PublishError::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
            output: push,
        }
        .into());
    }
    info!("push completed");
    Ok(PushOutcome::Pushed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RepoCall, ScriptedRepo};
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Records `name=value` for every field set when a span opens.
    #[derive(Clone, Default)]
    struct SpanFields(Arc<Mutex<Vec<String>>>);

    struct Collect(Vec<String>);

    impl Visit for Collect {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.push(format!("{}={value:?}", field.name()));
        }
    }

    impl<S: Subscriber> Layer<S> for SpanFields {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            let mut collect = Collect(Vec::new());
            attrs.record(&mut collect);
            self.0.lock().expect("lock").extend(collect.0);
        }
    }

    #[test]
    fn commits_then_pushes() {
        let repo = ScriptedRepo::new(["abc1234", "def5678"]);
        let outcome = commit_and_push(&repo, "origin", "main").expect("publish");
        assert_eq!(outcome, PushOutcome::Pushed);
        assert_eq!(
            repo.calls(),
            vec![
                RepoCall::StageAll,
                RepoCall::Commit(COMMIT_MESSAGE.to_string()),
                RepoCall::Push("origin".to_string(), "main".to_string()),
            ]
        );
    }

    #[test]
    fn span_records_remote_and_branch() {
        let fields = SpanFields::default();
        let subscriber = tracing_subscriber::registry().with(fields.clone());
        let repo = ScriptedRepo::new(["abc1234", "def5678"]);
        tracing::subscriber::with_default(subscriber, || {
            commit_and_push(&repo, "upstream", "release").expect("publish");
        });
        let recorded = fields.0.lock().expect("lock").clone();
        assert!(recorded.contains(&"remote=upstream".to_string()), "{recorded:?}");
        assert!(recorded.contains(&"branch=release".to_string()), "{recorded:?}");
    }

    #[test]
    fn nothing_to_commit_is_not_an_error() {
        for (stdout, stderr) in [
            ("On branch main\nnothing to commit, working tree clean\n", ""),
            ("", "Nothing To Commit"),
        ] {
            let repo = ScriptedRepo::new(["abc1234"])
                .with_commit_outputs([ProcessOutput::exited(1, stdout, stderr)]);
            let outcome = commit_and_push(&repo, "origin", "main").expect("publish");
            assert_eq!(outcome, PushOutcome::NothingToCommit);
            assert!(!repo.calls().iter().any(|c| matches!(c, RepoCall::Push(..))));
        }
    }

    #[test]
    fn other_commit_failure_is_fatal() {
        let repo = ScriptedRepo::new(["abc1234"]).with_commit_outputs([ProcessOutput::exited(
            128,
            "",
            "fatal: unable to auto-detect email address",
        )]);
        let err = commit_and_push(&repo, "origin", "main").unwrap_err();
        let publish = err.downcast_ref::<PublishError>().expect("publish error");
        assert!(matches!(publish, PublishError::Commit(_)));
        assert!(err.to_string().contains("unable to auto-detect email"));
    }

    #[test]
    fn push_failure_is_fatal_and_not_retried() {
        let repo = ScriptedRepo::new(["abc1234"]).with_push_outputs([ProcessOutput::exited(
            1,
            "",
            "! [rejected] main -> main (fetch first)",
        )]);
        let err = commit_and_push(&repo, "origin", "main").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PublishError>(),
            Some(PublishError::Push { .. })
        ));
        let pushes = repo
            .calls()
            .into_iter()
            .filter(|c| matches!(c, RepoCall::Push(..)))
            .count();
        assert_eq!(pushes, 1);
    }
}
