use std::path::Path;

use hop_core::{environment::Operation, release::ReleaseState, HopResult};
use hop_events::{HopEvent, PatchStage};
use tracing::debug;

use crate::{
    utils::{require_branch, require_current_release, require_release_state},
    HopContext, StageReport,
};

/// Copy a SQL script, and optionally its inverse, into the release in
/// progress.
///
/// A script whose name matches an already staged patch replaces it in place.
pub fn stage(ctx: &HopContext, source: &Path, inverse: Option<&Path>) -> HopResult<StageReport> {
    ctx.state()?.ensure_allowed(Operation::Stage)?;
    let _lock = ctx.lock()?;

    let release = require_current_release(ctx)?;
    require_branch(ctx, &release.branch_name())?;
    require_release_state(
        ctx,
        Operation::Stage,
        &release,
        &[
            ReleaseState::Preparing,
            ReleaseState::Ready,
            ReleaseState::Reverted,
        ],
    )?;

    let before = ctx
        .patches()
        .load_manifest(&release)?
        .map(|m| m.patches.len())
        .unwrap_or(0);
    let patch = ctx.patches().stage(&release, source, inverse)?;
    let replaced = ctx
        .patches()
        .load_manifest(&release)?
        .is_some_and(|m| m.patches.len() == before);

    ctx.vcs().commit(
        &format!("[hop] stage {} in release {release}", patch.name),
        &[ctx.relative(&ctx.patches().release_dir(&release))],
    )?;

    ctx.emit(HopEvent::Patch {
        release: release.to_string(),
        ordinal: patch.ordinal,
        name: patch.name.clone(),
        stage: PatchStage::Staged,
    });
    debug!(
        "Staged patch {} ({}) in release {release}",
        patch.ordinal, patch.name
    );

    Ok(StageReport {
        release,
        patch,
        replaced,
    })
}
