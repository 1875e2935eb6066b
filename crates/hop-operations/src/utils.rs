//! Building blocks shared by the operations.

use std::collections::BTreeSet;

use hop_core::{
    database::ReleaseStatus,
    environment::Operation,
    error::HopError,
    package::PackageWriteResult,
    patch::Patch,
    release::{ReleaseFacts, ReleaseId, ReleaseState},
    vcs::{committed_releases, is_tagged},
    HopResult,
};
use hop_events::{HopEvent, PatchStage, ReleaseStage};
use tracing::{debug, info};

use crate::HopContext;

/// A patch together with its verified script.
#[derive(Debug, Clone)]
pub struct PatchScript {
    pub patch: Patch,
    pub sql: String,
}

/// A release whose scripts were all read and verified up front.
#[derive(Debug, Clone)]
pub struct PlannedRelease {
    pub release: ReleaseId,
    pub scripts: Vec<PatchScript>,
}

/// The release currently being worked on.
///
/// That is the release named by the checked out `hop_*` branch or, when on
/// another branch, the highest applied or failed release above the last tag.
pub fn current_release(ctx: &HopContext) -> HopResult<Option<ReleaseId>> {
    let branch = ctx.vcs().current_branch()?;
    if let Some(release) = ReleaseId::from_branch(&branch) {
        return Ok(Some(release));
    }

    let last_tag = committed_releases(ctx.vcs())?.pop();
    let above_tag = |release: &ReleaseId| last_tag.as_ref().map_or(true, |tag| release > tag);

    let mut candidates: Vec<ReleaseId> = ctx
        .database()
        .failed_releases()?
        .into_iter()
        .chain(ctx.database().last_applied_release()?)
        .filter(above_tag)
        .collect();
    candidates.sort();

    while let Some(release) = candidates.pop() {
        if !is_tagged(ctx.vcs(), &release)? {
            return Ok(Some(release));
        }
    }
    Ok(None)
}

/// Like [`current_release`], failing with [`HopError::NoReleaseInProgress`].
pub fn require_current_release(ctx: &HopContext) -> HopResult<ReleaseId> {
    current_release(ctx)?.ok_or(HopError::NoReleaseInProgress)
}

pub fn release_facts(ctx: &HopContext, release: &ReleaseId) -> HopResult<ReleaseFacts> {
    Ok(ReleaseFacts {
        tagged: is_tagged(ctx.vcs(), release)?,
        status: ctx.database().release_status(release)?,
        applied_patches: ctx.database().applied_patches(release)?.len(),
        staged_patches: ctx
            .patches()
            .load_manifest(release)?
            .map(|manifest| manifest.patches.len())
            .unwrap_or(0),
    })
}

/// Fails unless `release` is in one of `allowed`.
pub fn require_release_state(
    ctx: &HopContext,
    operation: Operation,
    release: &ReleaseId,
    allowed: &[ReleaseState],
) -> HopResult<ReleaseState> {
    let state = release_facts(ctx, release)?.state();
    if allowed.contains(&state) {
        return Ok(state);
    }
    Err(HopError::OperationNotAllowed {
        operation: operation.to_string(),
        state: format!("release {release} is {state}"),
    })
}

pub fn require_branch(ctx: &HopContext, expected: &str) -> HopResult<()> {
    let actual = ctx.vcs().current_branch()?;
    if actual == expected {
        return Ok(());
    }
    Err(HopError::WrongBranch {
        expected: expected.to_string(),
        actual,
    })
}

/// Checks that the database sits on a committed release with no failure on
/// record, and returns that release.
pub fn check_binding(
    ctx: &HopContext,
    committed: &[ReleaseId],
) -> HopResult<Option<ReleaseId>> {
    if let Some(failed) = ctx.database().failed_releases()?.into_iter().next() {
        return Err(HopError::UnresolvedFailure {
            release: failed.to_string(),
        });
    }

    let last = ctx.database().last_applied_release()?;
    if let Some(release) = &last {
        if !committed.contains(release) {
            return Err(HopError::InconsistentBinding {
                reason: format!("last applied release {release} is not a committed release"),
            });
        }
    }
    Ok(last)
}

/// Reads and verifies the forward scripts of every release in `releases`.
///
/// Nothing touches the database until the whole chain checked out.
pub fn plan_forward(ctx: &HopContext, releases: &[ReleaseId]) -> HopResult<Vec<PlannedRelease>> {
    releases
        .iter()
        .map(|release| {
            let scripts = ctx
                .patches()
                .patches_for(release)?
                .into_iter()
                .map(|patch| {
                    let sql = ctx.patches().read_forward(&patch)?;
                    Ok(PatchScript { patch, sql })
                })
                .collect::<HopResult<Vec<_>>>()?;
            Ok(PlannedRelease {
                release: release.clone(),
                scripts,
            })
        })
        .collect()
}

/// Reads and verifies the inverse scripts of the applied patches of every
/// release in `releases`, last patch first.
pub fn plan_backward(ctx: &HopContext, releases: &[ReleaseId]) -> HopResult<Vec<PlannedRelease>> {
    releases
        .iter()
        .map(|release| {
            let applied: BTreeSet<u32> = ctx
                .database()
                .applied_patches(release)?
                .into_iter()
                .map(|p| p.ordinal)
                .collect();

            let mut patches: Vec<Patch> = ctx
                .patches()
                .patches_for(release)?
                .into_iter()
                .filter(|p| applied.contains(&p.ordinal))
                .collect();
            if patches.len() != applied.len() {
                return Err(HopError::NonContiguousHistory {
                    release: release.to_string(),
                    detail: "the database records patches missing from the release directory"
                        .into(),
                });
            }
            patches.reverse();

            let scripts = patches
                .into_iter()
                .map(|mut patch| {
                    let sql = ctx.patches().read_inverse(&patch)?;
                    patch.applied = true;
                    Ok(PatchScript { patch, sql })
                })
                .collect::<HopResult<Vec<_>>>()?;
            Ok(PlannedRelease {
                release: release.clone(),
                scripts,
            })
        })
        .collect()
}

fn emit_patch(ctx: &HopContext, patch: &Patch, stage: PatchStage) {
    ctx.emit(HopEvent::Patch {
        release: patch.release.to_string(),
        ordinal: patch.ordinal,
        name: patch.name.clone(),
        stage,
    });
}

pub fn emit_binding(ctx: &HopContext) -> HopResult<()> {
    let release = ctx.database().last_applied_release()?;
    ctx.emit(HopEvent::BindingUpdated {
        release: release.map(|r| r.to_string()),
    });
    Ok(())
}

/// Applies the scripts of `planned` in order, one transaction per patch, and
/// records the outcome for the release.
///
/// # Errors
///
/// * [`HopError::PatchApplicationFailed`] naming the first failing patch. The
///   patches before it stay applied and the release is marked failed.
pub fn apply_release(ctx: &HopContext, planned: &PlannedRelease) -> HopResult<usize> {
    let release = &planned.release;
    info!("Applying release {release} ({} patches)", planned.scripts.len());

    for script in &planned.scripts {
        let patch = &script.patch;
        emit_patch(ctx, patch, PatchStage::Applying);
        debug!(release = %release, ordinal = patch.ordinal, name = %patch.name, "applying patch");

        if let Err(err) = ctx.database().apply_patch(patch, &script.sql) {
            let cause = err.to_string();
            emit_patch(ctx, patch, PatchStage::Failed(cause.clone()));
            ctx.database()
                .set_release_status(release, ReleaseStatus::Failed)?;
            ctx.emit(HopEvent::Release {
                release: release.to_string(),
                stage: ReleaseStage::Failed {
                    ordinal: patch.ordinal,
                },
            });
            return Err(HopError::PatchApplicationFailed {
                release: release.to_string(),
                ordinal: patch.ordinal,
                cause,
            });
        }
        emit_patch(ctx, patch, PatchStage::Applied);
    }

    ctx.database()
        .set_release_status(release, ReleaseStatus::Applied)?;
    ctx.emit(HopEvent::Release {
        release: release.to_string(),
        stage: ReleaseStage::Applied,
    });
    emit_binding(ctx)?;
    Ok(planned.scripts.len())
}

/// Reverts the scripts of `planned` in order and marks the release reverted.
///
/// A failing inverse leaves the release marked failed.
pub fn revert_release(ctx: &HopContext, planned: &PlannedRelease) -> HopResult<usize> {
    let release = &planned.release;
    info!("Reverting release {release} ({} patches)", planned.scripts.len());

    for script in &planned.scripts {
        let patch = &script.patch;
        emit_patch(ctx, patch, PatchStage::Reverting);
        debug!(release = %release, ordinal = patch.ordinal, name = %patch.name, "reverting patch");

        if let Err(err) = ctx.database().revert_patch(patch, &script.sql) {
            emit_patch(ctx, patch, PatchStage::Failed(err.to_string()));
            ctx.database()
                .set_release_status(release, ReleaseStatus::Failed)?;
            return Err(err);
        }
        emit_patch(ctx, patch, PatchStage::Reverted);
    }

    ctx.database()
        .set_release_status(release, ReleaseStatus::Reverted)?;
    ctx.emit(HopEvent::Release {
        release: release.to_string(),
        stage: ReleaseStage::Reverted,
    });
    emit_binding(ctx)?;
    Ok(planned.scripts.len())
}

/// Regenerates the package, turning a failure into a divergence warning.
pub fn regenerate_or_warn(
    ctx: &HopContext,
    warnings: &mut Vec<HopError>,
) -> Option<PackageWriteResult> {
    match ctx.regenerate_package() {
        Ok(result) => Some(result),
        Err(err) => {
            let warning = err.into_package_sync_warning();
            debug!("{warning}");
            warnings.push(warning);
            None
        }
    }
}
