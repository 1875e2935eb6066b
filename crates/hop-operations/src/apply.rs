use hop_core::{
    environment::Operation, error::HopError, release::ReleaseState, vcs::committed_releases,
    HopResult,
};

use crate::{
    utils::{
        apply_release, plan_forward, regenerate_or_warn, require_branch,
        require_current_release, require_release_state,
    },
    ApplyReport, HopContext,
};

/// Apply the patches of the release in progress to the development database.
///
/// Every checksum is verified before the first patch runs. Patches run in
/// ordinal order, each in its own transaction.
///
/// # Errors
///
/// * [`HopError::OutOfOrderRelease`] if the database already holds this or a
///   later release.
/// * [`HopError::PredecessorNotApplied`] unless the database sits exactly on
///   the committed release this one follows.
/// * [`HopError::PatchApplicationFailed`] naming the failing patch.
pub fn apply(ctx: &HopContext) -> HopResult<ApplyReport> {
    ctx.state()?.ensure_allowed(Operation::Apply)?;
    let _lock = ctx.lock()?;

    let release = require_current_release(ctx)?;
    require_branch(ctx, &release.branch_name())?;
    require_release_state(
        ctx,
        Operation::Apply,
        &release,
        &[
            ReleaseState::Preparing,
            ReleaseState::Ready,
            ReleaseState::Reverted,
        ],
    )?;

    let last = ctx.database().last_applied_release()?;
    if let Some(last) = &last {
        if *last >= release {
            return Err(HopError::OutOfOrderRelease {
                release: release.to_string(),
                last: last.to_string(),
            });
        }
    }

    // the database must sit on the committed release this one follows
    let predecessor = committed_releases(ctx.vcs())?
        .into_iter()
        .rev()
        .find(|committed| *committed < release);
    if last != predecessor {
        return Err(HopError::PredecessorNotApplied {
            release: release.to_string(),
            expected: predecessor.map_or_else(|| "no release".into(), |r| r.to_string()),
            actual: last.map_or_else(|| "no release".into(), |r| r.to_string()),
        });
    }

    let planned = plan_forward(ctx, std::slice::from_ref(&release))?;
    let mut applied = 0;
    for step in &planned {
        applied += apply_release(ctx, step)?;
    }

    let mut warnings = Vec::new();
    let package = regenerate_or_warn(ctx, &mut warnings);

    Ok(ApplyReport {
        release,
        applied,
        package,
        warnings,
    })
}
