use std::path::PathBuf;

use hop_core::{
    environment::{Operation, RepositoryState},
    error::HopError,
    package::PackageWriteResult,
    patch::Patch,
    release::{ReleaseId, ReleaseState},
};

// ---- Prepare / Stage ----

/// Report returned after a release was prepared.
#[derive(Debug)]
pub struct PrepareReport {
    pub release: ReleaseId,
    pub branch: String,
    pub release_dir: PathBuf,
}

#[derive(Debug)]
pub struct StageReport {
    pub release: ReleaseId,
    pub patch: Patch,
    /// Whether an existing patch of the same name was refreshed.
    pub replaced: bool,
}

// ---- Apply / Undo ----

#[derive(Debug)]
pub struct ApplyReport {
    pub release: ReleaseId,
    pub applied: usize,
    pub package: Option<PackageWriteResult>,
    pub warnings: Vec<HopError>,
}

#[derive(Debug)]
pub struct UndoReport {
    pub release: ReleaseId,
    pub reverted: usize,
    /// Name of the discarded release branch, if any.
    pub branch_discarded: Option<String>,
    pub package: Option<PackageWriteResult>,
    pub warnings: Vec<HopError>,
}

// ---- Release ----

#[derive(Debug)]
pub struct ReleaseReport {
    pub release: ReleaseId,
    pub tag: String,
    pub commit: String,
    pub pushed: bool,
    pub warnings: Vec<HopError>,
}

// ---- Restore / Upgrade ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One release moved across during a restore or upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseStep {
    pub release: ReleaseId,
    pub direction: Direction,
    pub patches: usize,
}

#[derive(Debug)]
pub struct RestoreReport {
    pub from: Option<ReleaseId>,
    pub to: ReleaseId,
    pub steps: Vec<ReleaseStep>,
    pub package: Option<PackageWriteResult>,
    pub warnings: Vec<HopError>,
}

#[derive(Debug)]
pub struct UpgradeReport {
    pub from: Option<ReleaseId>,
    pub steps: Vec<ReleaseStep>,
    pub package: Option<PackageWriteResult>,
    pub warnings: Vec<HopError>,
}

impl UpgradeReport {
    pub fn is_up_to_date(&self) -> bool {
        self.steps.is_empty()
    }
}

// ---- Sync / New ----

#[derive(Debug)]
pub struct SyncReport {
    pub package: PackageWriteResult,
}

#[derive(Debug)]
pub struct InitReport {
    pub root: PathBuf,
    pub release: ReleaseId,
    pub tag: String,
    pub warnings: Vec<HopError>,
}

// ---- Status ----

/// Where the release in progress stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub release: ReleaseId,
    pub state: ReleaseState,
    pub staged_patches: usize,
    pub applied_patches: usize,
}

#[derive(Debug)]
pub struct StatusReport {
    pub state: RepositoryState,
    pub current: Option<ReleaseSummary>,
    pub failed: Vec<ReleaseId>,
    pub allowed: Vec<Operation>,
}
