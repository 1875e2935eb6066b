use hop_core::{environment::Operation, vcs::committed_releases, HopResult};
use tracing::debug;

use crate::{
    utils::{apply_release, check_binding, plan_forward, regenerate_or_warn, require_branch},
    Direction, HopContext, ReleaseStep, UpgradeReport,
};

/// Bring the production database up to the last committed release.
///
/// Every committed release above the database's last applied one is applied,
/// strictly ascending. A failure halts the sequence; the binding then points
/// at the last release that fully succeeded.
pub fn upgrade(ctx: &HopContext) -> HopResult<UpgradeReport> {
    ctx.state()?.ensure_allowed(Operation::Upgrade)?;
    let _lock = ctx.lock()?;

    require_branch(ctx, ctx.project().main_branch())?;
    let committed = committed_releases(ctx.vcs())?;
    let from = check_binding(ctx, &committed)?;

    let pending: Vec<_> = committed
        .into_iter()
        .filter(|release| from.as_ref().map_or(true, |last| release > last))
        .collect();

    if pending.is_empty() {
        debug!("Database is up to date");
        return Ok(UpgradeReport {
            from,
            steps: Vec::new(),
            package: None,
            warnings: Vec::new(),
        });
    }

    let mut steps = Vec::with_capacity(pending.len());
    for planned in plan_forward(ctx, &pending)? {
        let patches = apply_release(ctx, &planned)?;
        steps.push(ReleaseStep {
            release: planned.release,
            direction: Direction::Forward,
            patches,
        });
    }

    let mut warnings = Vec::new();
    let package = regenerate_or_warn(ctx, &mut warnings);

    debug!("Upgraded database through {} releases", steps.len());
    Ok(UpgradeReport {
        from,
        steps,
        package,
        warnings,
    })
}
