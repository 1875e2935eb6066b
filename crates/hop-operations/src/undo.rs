use hop_core::{environment::Operation, release::ReleaseState, HopResult};
use hop_events::{HopEvent, ReleaseStage};
use tracing::debug;

use crate::{
    utils::{
        plan_backward, regenerate_or_warn, require_current_release, require_release_state,
        revert_release,
    },
    HopContext, UndoReport,
};

/// Roll the release in progress back out of the database.
///
/// Every applied patch must have an inverse; this is checked before anything
/// is reverted. Unless `database_only`, the release branch is discarded too.
pub fn undo(ctx: &HopContext, database_only: bool) -> HopResult<UndoReport> {
    ctx.state()?.ensure_allowed(Operation::Undo)?;
    let _lock = ctx.lock()?;

    let release = require_current_release(ctx)?;
    require_release_state(
        ctx,
        Operation::Undo,
        &release,
        &[ReleaseState::Applied, ReleaseState::Failed],
    )?;

    let planned = plan_backward(ctx, std::slice::from_ref(&release))?;
    let mut reverted = 0;
    for step in &planned {
        reverted += revert_release(ctx, step)?;
    }

    let mut warnings = Vec::new();
    let package = regenerate_or_warn(ctx, &mut warnings);

    let mut branch_discarded = None;
    if !database_only {
        let branch = release.branch_name();
        if ctx.vcs().current_branch()? == branch {
            ctx.vcs().checkout(ctx.project().main_branch())?;
        }
        if ctx.vcs().branch_exists(&branch)? {
            ctx.vcs().delete_branch(&branch)?;
            ctx.emit(HopEvent::Release {
                release: release.to_string(),
                stage: ReleaseStage::BranchDiscarded {
                    branch: branch.clone(),
                },
            });
            debug!("Discarded branch {branch}");
            branch_discarded = Some(branch);
        }
    }

    debug!("Reverted release {release} ({reverted} patches)");
    Ok(UndoReport {
        release,
        reverted,
        branch_discarded,
        package,
        warnings,
    })
}
