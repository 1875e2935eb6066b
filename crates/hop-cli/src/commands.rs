use std::{path::Path, sync::Arc};

use hop_core::{
    release::{BumpLevel, ReleaseId},
    HopResult,
};
use hop_events::EventSinkHandle;
use hop_operations::{
    apply, init, prepare, release, restore, stage, sync, undo, upgrade, Direction, HopContext,
};
use nu_ansi_term::Color::{Cyan, Green, Yellow};
use tracing::info;

use crate::{
    sink::LogSink,
    utils::{report_warnings, Colored, Icons},
};

pub fn log_sink() -> EventSinkHandle {
    Arc::new(LogSink)
}

pub fn new_package(parent: &Path, name: &str, devel: bool) -> HopResult<()> {
    let report = init::new_package(parent, name, devel, log_sink())?;
    info!(
        "{} Created {} at {} ({})",
        Colored(Green, Icons::CHECK),
        Colored(Cyan, name),
        report.root.display(),
        report.tag
    );
    report_warnings(report.warnings);
    Ok(())
}

pub fn prepare_release(ctx: &HopContext, level: &str, message: Option<&str>) -> HopResult<()> {
    let level: BumpLevel = level.parse()?;
    let report = prepare::prepare(ctx, level, message)?;
    info!(
        "{} Prepared release {} on branch {}",
        Colored(Green, Icons::CHECK),
        Colored(Cyan, &report.release),
        report.branch
    );
    info!("  stage patches with `hop stage <file.sql>`");
    Ok(())
}

pub fn stage_patch(ctx: &HopContext, file: &Path, down: Option<&Path>) -> HopResult<()> {
    let report = stage::stage(ctx, file, down)?;
    let verb = if report.replaced { "Replaced" } else { "Staged" };
    info!(
        "{} {verb} patch {:03} {} in release {}",
        Colored(Green, Icons::CHECK),
        report.patch.ordinal,
        report.patch.name,
        Colored(Cyan, &report.release)
    );
    if !report.patch.is_reversible() {
        info!(
            "  {} no inverse script, the release cannot be undone",
            Colored(Yellow, Icons::WARNING)
        );
    }
    Ok(())
}

pub fn apply_release(ctx: &HopContext) -> HopResult<()> {
    let report = apply::apply(ctx)?;
    info!(
        "{} Applied {} patch(es) of release {}",
        Colored(Green, Icons::CHECK),
        report.applied,
        Colored(Cyan, &report.release)
    );
    report_warnings(report.warnings);
    Ok(())
}

pub fn undo_release(ctx: &HopContext, database_only: bool) -> HopResult<()> {
    let report = undo::undo(ctx, database_only)?;
    info!(
        "{} Reverted {} patch(es) of release {}",
        Colored(Green, Icons::CHECK),
        report.reverted,
        Colored(Cyan, &report.release)
    );
    if let Some(branch) = report.branch_discarded {
        info!("  discarded branch {branch}");
    }
    report_warnings(report.warnings);
    Ok(())
}

pub fn commit_release(ctx: &HopContext, push: bool) -> HopResult<()> {
    let report = release::release(ctx, push)?;
    info!(
        "{} Released {} as {}",
        Colored(Green, Icons::CHECK),
        Colored(Cyan, &report.release),
        report.tag
    );
    if report.pushed {
        info!("  pushed to {}", ctx.project().remote());
    }
    report_warnings(report.warnings);
    Ok(())
}

fn log_steps(steps: &[hop_operations::ReleaseStep]) {
    for step in steps {
        let verb = match step.direction {
            Direction::Forward => "applied",
            Direction::Backward => "reverted",
        };
        info!(
            "  {} {} ({verb} {} patch(es))",
            Icons::ARROW,
            step.release,
            step.patches
        );
    }
}

pub fn restore_release(ctx: &HopContext, target: &str, force: bool) -> HopResult<()> {
    let target: ReleaseId = target.parse()?;
    let report = restore::restore(ctx, &target, force)?;
    if report.steps.is_empty() {
        info!("Database is already at release {}", Colored(Cyan, &report.to));
        return Ok(());
    }

    log_steps(&report.steps);
    info!(
        "{} Restored database from {} to {}",
        Colored(Green, Icons::CHECK),
        report
            .from
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "nothing".into()),
        Colored(Cyan, &report.to)
    );
    report_warnings(report.warnings);
    Ok(())
}

pub fn upgrade_database(ctx: &HopContext) -> HopResult<()> {
    let report = upgrade::upgrade(ctx)?;
    if report.is_up_to_date() {
        info!("Database is up to date");
        return Ok(());
    }

    log_steps(&report.steps);
    info!(
        "{} Upgraded database by {} release(s)",
        Colored(Green, Icons::CHECK),
        report.steps.len()
    );
    report_warnings(report.warnings);
    Ok(())
}

pub fn sync_package(ctx: &HopContext) -> HopResult<()> {
    let report = sync::sync_package(ctx)?;
    if report.package.changed {
        info!(
            "{} Package regenerated ({} file(s))",
            Colored(Green, Icons::CHECK),
            report.package.files.len()
        );
    } else {
        info!("Package is up to date");
    }
    Ok(())
}
