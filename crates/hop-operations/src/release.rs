use hop_core::{environment::Operation, error::HopError, release::ReleaseState, HopResult};
use hop_events::{HopEvent, ReleaseStage};
use tracing::debug;

use crate::{
    utils::{require_branch, require_current_release, require_release_state},
    HopContext, ReleaseReport,
};

/// Commit the applied release: record its patches and package on the release
/// branch, fast-forward the main branch onto it and tag the result.
///
/// With `push`, the main branch and the new tag are pushed. A failed push is
/// reported as a warning; the local commit and tag stay.
pub fn release(ctx: &HopContext, push: bool) -> HopResult<ReleaseReport> {
    ctx.state()?.ensure_allowed(Operation::Release)?;
    let _lock = ctx.lock()?;

    let release = require_current_release(ctx)?;
    let branch = release.branch_name();
    require_branch(ctx, &branch)?;
    require_release_state(ctx, Operation::Release, &release, &[ReleaseState::Applied])?;

    let paths = vec![
        ctx.relative(&ctx.patches().release_dir(&release)),
        ctx.package_dir(),
    ];
    ctx.vcs()
        .commit(&format!("[hop] release {release}"), &paths)?;

    let main = ctx.project().main_branch();
    ctx.vcs().checkout(main)?;
    ctx.vcs().merge_fast_forward(&branch)?;

    let commit = ctx.vcs().head()?;
    let tag = release.tag_name();
    ctx.vcs().tag(&tag, &commit)?;
    ctx.emit(HopEvent::Release {
        release: release.to_string(),
        stage: ReleaseStage::Committed { tag: tag.clone() },
    });
    debug!("Released {release} as {tag}");

    let mut warnings = Vec::new();
    let mut pushed = false;
    if push {
        let remote = ctx.project().remote();
        let tags = vec![tag.clone()];
        match ctx.vcs().push(remote, main, &tags) {
            Ok(()) => {
                ctx.emit(HopEvent::Pushed {
                    remote: remote.to_string(),
                    branch: main.to_string(),
                    tags,
                });
                debug!("Pushed {main} and {tag} to {remote}");
                pushed = true;
            }
            Err(err) => {
                let warning = HopError::PushFailed {
                    remote: remote.to_string(),
                    reason: err.to_string(),
                };
                debug!("{warning}");
                warnings.push(warning);
            }
        }
    }

    Ok(ReleaseReport {
        release,
        tag,
        commit,
        pushed,
        warnings,
    })
}
