use hop_core::{
    database::ReleaseStatus,
    environment::{Mode, Operation},
    error::HopError,
    release::ReleaseId,
    vcs::committed_releases,
    HopResult,
};
use tracing::debug;

use crate::{
    utils::{
        apply_release, check_binding, plan_backward, plan_forward, regenerate_or_warn,
        require_branch, revert_release,
    },
    Direction, HopContext, ReleaseStep, RestoreReport,
};

/// Move the database to the committed release `target`.
///
/// Walks backward through the inverses of every applied release above the
/// target, or forward through every committed release up to it. The binding
/// is updated after each release. The whole chain is read and verified before
/// the database is touched.
///
/// Outside production this needs `force`.
///
/// # Errors
///
/// * [`HopError::UnknownRelease`] if `target` is not a committed release.
/// * [`HopError::NonContiguousHistory`] if a release along the way is missing
///   patch files.
/// * [`HopError::IrreversiblePatch`] if a patch to roll back has no inverse.
pub fn restore(ctx: &HopContext, target: &ReleaseId, force: bool) -> HopResult<RestoreReport> {
    let state = ctx.state()?;
    if !(force && state.initialized && state.mode == Mode::Development) {
        state.ensure_allowed(Operation::Restore)?;
    }
    let _lock = ctx.lock()?;

    require_branch(ctx, ctx.project().main_branch())?;
    let committed = committed_releases(ctx.vcs())?;
    let current = check_binding(ctx, &committed)?;

    let target = target.base();
    if !committed.contains(&target) {
        return Err(HopError::UnknownRelease(target.to_string()));
    }

    let mut steps = Vec::new();
    let direction = match &current {
        Some(current) if *current == target => None,
        Some(current) if *current > target => Some(Direction::Backward),
        _ => Some(Direction::Forward),
    };

    match direction {
        None => debug!("Database is already at release {target}"),
        Some(Direction::Backward) => {
            let mut chain = Vec::new();
            for release in committed.iter().rev() {
                if *release <= target || current.as_ref().is_some_and(|c| release > c) {
                    continue;
                }
                if ctx.database().release_status(release)? == Some(ReleaseStatus::Applied) {
                    chain.push(release.clone());
                }
            }
            debug!(chain = ?chain, "restoring backward");

            for planned in plan_backward(ctx, &chain)? {
                let patches = revert_release(ctx, &planned)?;
                steps.push(ReleaseStep {
                    release: planned.release,
                    direction: Direction::Backward,
                    patches,
                });
            }
        }
        Some(Direction::Forward) => {
            let chain: Vec<ReleaseId> = committed
                .iter()
                .filter(|r| current.as_ref().map_or(true, |c| *r > c) && **r <= target)
                .cloned()
                .collect();
            debug!(chain = ?chain, "restoring forward");

            for planned in plan_forward(ctx, &chain)? {
                let patches = apply_release(ctx, &planned)?;
                steps.push(ReleaseStep {
                    release: planned.release,
                    direction: Direction::Forward,
                    patches,
                });
            }
        }
    }

    let mut warnings = Vec::new();
    let package = if steps.is_empty() {
        None
    } else {
        regenerate_or_warn(ctx, &mut warnings)
    };

    debug!("Database restored to release {target}");
    Ok(RestoreReport {
        from: current,
        to: target,
        steps,
        package,
        warnings,
    })
}
