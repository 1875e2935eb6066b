use hop_core::HopResult;

use crate::{
    utils::{current_release, release_facts},
    HopContext, ReleaseSummary, StatusReport,
};

/// Describe the repository without changing anything. Takes no lock.
pub fn status(ctx: &HopContext) -> HopResult<StatusReport> {
    let state = ctx.state()?;

    let current = match current_release(ctx)? {
        Some(release) => {
            let facts = release_facts(ctx, &release)?;
            Some(ReleaseSummary {
                state: facts.state(),
                staged_patches: facts.staged_patches,
                applied_patches: facts.applied_patches,
                release,
            })
        }
        None => None,
    };

    Ok(StatusReport {
        allowed: state.allowed_operations().to_vec(),
        failed: ctx.database().failed_releases()?,
        current,
        state,
    })
}
