use std::path::PathBuf;

/// All event types emitted by hop operations.
///
/// Releases are identified by their display form (`1.3.0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopEvent {
    /// Lifecycle transition of a release.
    Release {
        release: String,
        stage: ReleaseStage,
    },
    /// Progress of a single patch.
    Patch {
        release: String,
        ordinal: u32,
        name: String,
        stage: PatchStage,
    },
    /// Branch and tags were pushed to a remote.
    Pushed {
        remote: String,
        branch: String,
        tags: Vec<String>,
    },
    /// The database's last applied release changed.
    BindingUpdated { release: Option<String> },
    /// The package snapshot was rewritten.
    PackageRegenerated {
        files: Vec<PathBuf>,
        changed: bool,
    },
    /// Free-form log message.
    Log { level: LogLevel, message: String },
}

/// Release lifecycle stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStage {
    Prepared { branch: String },
    Applied,
    Failed { ordinal: u32 },
    Reverted,
    BranchDiscarded { branch: String },
    Committed { tag: String },
}

/// Patch stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchStage {
    Staged,
    Applying,
    Applied,
    Failed(String),
    Reverting,
    Reverted,
}

/// Log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}
