use hop_core::{environment::Operation, error::HopError, HopResult};
use hop_operations::{status, HopContext, StatusReport};
use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};
use serde::Serialize;
use tracing::info;

use crate::utils::{Colored, Icons};

#[derive(Serialize)]
struct StatusView<'a> {
    package: Option<&'a str>,
    state: String,
    branch: Option<&'a str>,
    last_applied_release: Option<String>,
    last_committed_release: Option<String>,
    current_release: Option<CurrentView>,
    failed_releases: Vec<String>,
    allowed: Vec<&'static str>,
}

#[derive(Serialize)]
struct CurrentView {
    release: String,
    state: String,
    staged_patches: usize,
    applied_patches: usize,
}

impl<'a> StatusView<'a> {
    fn new(package: Option<&'a str>, report: &'a StatusReport) -> Self {
        Self {
            package,
            state: report.state.describe(),
            branch: report.state.branch.as_deref(),
            last_applied_release: report
                .state
                .last_applied_release
                .as_ref()
                .map(ToString::to_string),
            last_committed_release: report
                .state
                .last_committed_release
                .as_ref()
                .map(ToString::to_string),
            current_release: report.current.as_ref().map(|current| {
                CurrentView {
                    release: current.release.to_string(),
                    state: current.state.to_string(),
                    staged_patches: current.staged_patches,
                    applied_patches: current.applied_patches,
                }
            }),
            failed_releases: report.failed.iter().map(ToString::to_string).collect(),
            allowed: report.allowed.iter().map(Operation::as_str).collect(),
        }
    }
}

/// Prints the hint shown outside of any hop repository.
pub fn display_uninitialized(json: bool) -> HopResult<()> {
    if json {
        let view = serde_json::json!({
            "state": "not a hop repository",
            "allowed": [Operation::New.as_str()],
        });
        println!("{view}");
        return Ok(());
    }

    info!("Not in a hop repository.");
    info!("Try {}", Colored(Cyan, "hop new [--devel] <package name>"));
    Ok(())
}

pub fn display_status(ctx: &HopContext, json: bool) -> HopResult<()> {
    let report = status::status(ctx)?;
    let view = StatusView::new(Some(ctx.project().package_name.as_str()), &report);

    if json {
        let output = serde_json::to_string_pretty(&view)
            .map_err(|err| HopError::Custom(format!("serializing status: {err}")))?;
        println!("{output}");
        return Ok(());
    }

    info!(
        "{} ({})",
        Colored(Cyan, ctx.project().package_name.as_str()),
        view.state
    );
    if let Some(branch) = view.branch {
        info!("  {} {branch}", Icons::BRANCH);
    }
    info!(
        "  last committed release: {}",
        view.last_committed_release.as_deref().unwrap_or("none")
    );
    info!(
        "  last applied release:   {}",
        view.last_applied_release.as_deref().unwrap_or("none")
    );

    if let Some(current) = &view.current_release {
        info!(
            "  release {} is {} ({} staged, {} applied)",
            Colored(Green, &current.release),
            Colored(Yellow, &current.state),
            current.staged_patches,
            current.applied_patches
        );
    }

    for failed in &view.failed_releases {
        info!(
            "  {} release {failed} failed on this database",
            Colored(Red, Icons::CROSS)
        );
    }

    info!("");
    info!("Available operations:");
    for operation in &view.allowed {
        info!("  hop {operation}");
    }

    Ok(())
}
