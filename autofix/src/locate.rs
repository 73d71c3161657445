//! Locating the deployment built from the current revision.
//!
//! Candidates are inspected in listed order and the first whose inspection
//! output mentions the short revision wins. Nothing is cached between calls:
//! a previous iteration may have pushed a new revision.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::deployments::{mentions_revision, parse_deployment_list};
use crate::io::git::Repository;
use crate::io::vercel::DeploymentPlatform;

/// Deployment matched to a revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedDeployment {
    /// Identifier or URL as printed by the listing.
    pub id: String,
    /// Short revision the deployment was matched on.
    pub revision: String,
}

/// Build logs for the deployment of the current revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLogs {
    pub deployment: LocatedDeployment,
    pub text: String,
}

/// Find the deployment whose inspection output references HEAD.
///
/// A failed or empty listing, or no matching candidate, is `Ok(None)`: the
/// platform may still be building and the loop decides whether to wait.
/// Errors are reserved for tools that cannot be run at all.
#[instrument(skip_all)]
pub fn locate_deployment<P, R>(platform: &P, repo: &R) -> Result<Option<LocatedDeployment>>
where
    P: DeploymentPlatform,
    R: Repository,
{
    let revision = repo
        .current_revision(true)
        .context("resolve current revision")?;
    info!(revision = %revision, "looking for deployment of revision");

    let listing = platform.list_deployments()?;
    if !listing.success() || listing.stdout.trim().is_empty() {
        warn!(
            exit_code = ?listing.exit_code,
            stderr = %listing.stderr.trim(),
            "deployment listing failed or returned no data"
        );
        return Ok(None);
    }

    let candidates = parse_deployment_list(&listing.stdout);
    if candidates.is_empty() {
        warn!("could not parse any deployment candidates from the listing");
        return Ok(None);
    }
    debug!(count = candidates.len(), "parsed deployment candidates");

    for id in &candidates {
        debug!(id = %id, "inspecting candidate");
        let inspection = platform.inspect_deployment(id, false)?;
        if mentions_revision(&inspection.stdout, &inspection.stderr, &revision) {
            info!(id = %id, revision = %revision, "matched deployment");
            return Ok(Some(LocatedDeployment {
                id: id.clone(),
                revision,
            }));
        }
    }

    warn!(
        revision = %revision,
        candidates = candidates.len(),
        "no deployment found for revision"
    );
    Ok(None)
}

/// Locate the deployment of HEAD and fetch its build logs, waiting for the
/// build to settle.
///
/// Logs are taken from stdout, falling back to stderr when stdout is blank.
/// Blank logs are `Ok(None)`.
#[instrument(skip_all)]
pub fn fetch_build_logs<P, R>(platform: &P, repo: &R) -> Result<Option<BuildLogs>>
where
    P: DeploymentPlatform,
    R: Repository,
{
    let Some(deployment) = locate_deployment(platform, repo)? else {
        return Ok(None);
    };

    let inspection = platform.inspect_deployment(&deployment.id, true)?;
    let text = if inspection.stdout.trim().is_empty() {
        inspection.stderr
    } else {
        inspection.stdout
    };
    if text.trim().is_empty() {
        warn!(id = %deployment.id, "no logs returned for deployment");
        return Ok(None);
    }
    Ok(Some(BuildLogs { deployment, text }))
}
