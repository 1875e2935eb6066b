use std::path::PathBuf;

use hop_core::{
    environment::Operation,
    error::HopError,
    release::{plan_next, BumpLevel, ReleaseId, ReleaseState},
    vcs::committed_releases,
    HopResult,
};
use hop_events::{HopEvent, ReleaseStage};
use tracing::{debug, warn};

use crate::{
    utils::{current_release, release_facts, require_branch},
    HopContext, PrepareReport,
};

/// Start the next release: plan its identifier from the last committed
/// release, create its branch and an empty release directory.
///
/// # Errors
///
/// * [`HopError::ReleaseInProgress`] if a release is already being worked on.
/// * [`HopError::WrongBranch`] unless run from the main branch.
pub fn prepare(
    ctx: &HopContext,
    level: BumpLevel,
    message: Option<&str>,
) -> HopResult<PrepareReport> {
    ctx.state()?.ensure_allowed(Operation::Prepare)?;
    let _lock = ctx.lock()?;

    if let Some(release) = current_release(ctx)? {
        if release_facts(ctx, &release)?.state() != ReleaseState::Committed {
            return Err(HopError::ReleaseInProgress {
                release: release.to_string(),
            });
        }
    }
    require_branch(ctx, ctx.project().main_branch())?;

    let committed = committed_releases(ctx.vcs())?;
    let release = plan_next(level, committed.last())?;
    debug!(level = %level, last = ?committed.last(), next = %release, "planned release");

    let branch = release.branch_name();
    if ctx.vcs().branch_exists(&branch)? {
        return Err(HopError::ReleaseInProgress {
            release: release.to_string(),
        });
    }

    ctx.vcs().create_branch(&branch)?;
    let release_dir = match start_release(ctx, &release, message) {
        Ok(dir) => dir,
        Err(err) => {
            abandon_branch(ctx, &branch);
            return Err(err);
        }
    };

    ctx.emit(HopEvent::Release {
        release: release.to_string(),
        stage: ReleaseStage::Prepared {
            branch: branch.clone(),
        },
    });
    debug!("Prepared release {release} on branch {branch}");

    Ok(PrepareReport {
        release,
        branch,
        release_dir,
    })
}

fn start_release(
    ctx: &HopContext,
    release: &ReleaseId,
    message: Option<&str>,
) -> HopResult<PathBuf> {
    let release_dir = ctx.patches().create_release(release, message)?;
    ctx.vcs().commit(
        &format!("[hop] prepare release {release}"),
        &[ctx.relative(&release_dir)],
    )?;
    Ok(release_dir)
}

/// Returns to the main branch and drops the half-prepared release branch.
fn abandon_branch(ctx: &HopContext, branch: &str) {
    let cleanup = ctx
        .vcs()
        .checkout(ctx.project().main_branch())
        .and_then(|()| ctx.vcs().delete_branch(branch));
    if let Err(err) = cleanup {
        warn!(branch, error = %err, "failed to remove release branch");
    }
}
