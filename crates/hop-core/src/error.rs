//! Error types for hop-core.

use std::path::PathBuf;

use hop_config::error::ConfigError;
use hop_db::error::DbError;
use hop_utils::error::{FileSystemError, HashError, LockError};
use miette::Diagnostic;
use thiserror::Error;

/// Engine error type for hop operations.
#[derive(Error, Diagnostic, Debug)]
pub enum HopError {
    #[error("Repository state could not be determined: {reason}")]
    #[diagnostic(
        code(hop::environment_unknown),
        help("Check that the database is reachable and the git history is readable")
    )]
    EnvironmentUnknown { reason: String },

    #[error("`{operation}` is not allowed here ({state})")]
    #[diagnostic(
        code(hop::operation_not_allowed),
        help("Run `hop` without a subcommand to list the available operations")
    )]
    OperationNotAllowed { operation: String, state: String },

    #[error("Release {release} is already in progress")]
    #[diagnostic(
        code(hop::release_in_progress),
        help("Finish it with `hop release` or discard it with `hop undo`")
    )]
    ReleaseInProgress { release: String },

    #[error("No release in progress")]
    #[diagnostic(
        code(hop::no_release_in_progress),
        help("Start one with `hop prepare`, or check out its hop_<release> branch")
    )]
    NoReleaseInProgress,

    #[error("Invalid bump level: {0:?}")]
    #[diagnostic(
        code(hop::invalid_bump_level),
        help("Use one of: patch, minor, major")
    )]
    InvalidBumpLevel(String),

    #[error("Invalid release identifier: {0:?}")]
    #[diagnostic(
        code(hop::invalid_release_id),
        help("Release identifiers look like 1.3.0")
    )]
    InvalidReleaseId(String),

    #[error("Patch {ordinal} of release {release} failed: {cause}")]
    #[diagnostic(
        code(hop::patch_failed),
        help("Patches before {ordinal} stay applied. Run `hop undo` to roll them back")
    )]
    PatchApplicationFailed {
        release: String,
        ordinal: u32,
        cause: String,
    },

    #[error("Patch {ordinal} ({name}) of release {release} has no inverse")]
    #[diagnostic(
        code(hop::irreversible_patch),
        help("Stage an inverse script with `hop stage <file> --down <inverse>`")
    )]
    IrreversiblePatch {
        release: String,
        ordinal: u32,
        name: String,
    },

    #[error("Unknown release: {0}")]
    #[diagnostic(
        code(hop::unknown_release),
        help("Only committed releases (tags v<release> on the main branch) can be targeted")
    )]
    UnknownRelease(String),

    #[error("Patch history of release {release} is not contiguous: {detail}")]
    #[diagnostic(
        code(hop::non_contiguous_history),
        help("Restore the missing patch files from version control")
    )]
    NonContiguousHistory { release: String, detail: String },

    #[error("Database and package are now divergent: {reason}")]
    #[diagnostic(
        code(hop::package_sync_failed),
        severity(warning),
        help("Run `hop sync-package` once the cause is fixed")
    )]
    PackageSyncFailed { reason: String },

    #[error("Failed to push to {remote}: {reason}")]
    #[diagnostic(
        code(hop::push_failed),
        severity(warning),
        help("The release is committed and tagged locally. Push it with `git push --follow-tags`")
    )]
    PushFailed { remote: String, reason: String },

    #[error("Another hop operation holds the repository lock ({})", path.display())]
    #[diagnostic(
        code(hop::lock_contention),
        help("Wait for the other operation to finish")
    )]
    LockContention { path: PathBuf },

    #[error("Checksum mismatch for patch {ordinal} of release {release}: expected {expected}, found {actual}")]
    #[diagnostic(
        code(hop::checksum_mismatch),
        help("The patch file changed after it was staged. Re-stage it with `hop stage`")
    )]
    ChecksumMismatch {
        release: String,
        ordinal: u32,
        expected: String,
        actual: String,
    },

    #[error("Release {release} is not above the last applied release {last}")]
    #[diagnostic(
        code(hop::out_of_order_release),
        help("Releases are applied to a database in increasing order only")
    )]
    OutOfOrderRelease { release: String, last: String },

    #[error("Release {release} follows {expected}, but the database is at {actual}")]
    #[diagnostic(
        code(hop::predecessor_not_applied),
        help("Bring the database to {expected} first with `hop restore --force {expected}`")
    )]
    PredecessorNotApplied {
        release: String,
        expected: String,
        actual: String,
    },

    #[error("Database binding is inconsistent: {reason}")]
    #[diagnostic(
        code(hop::inconsistent_binding),
        help("The database must sit on a committed release. Repair it manually before retrying")
    )]
    InconsistentBinding { reason: String },

    #[error("Release {release} previously failed on this database")]
    #[diagnostic(
        code(hop::unresolved_failure),
        help("Repair the database manually and record the outcome before retrying")
    )]
    UnresolvedFailure { release: String },

    #[error("Expected to be on branch {expected}, but on {actual}")]
    #[diagnostic(code(hop::wrong_branch), help("Run `git checkout {expected}` first"))]
    WrongBranch { expected: String, actual: String },

    #[error("Invalid patch {}: {reason}", path.display())]
    #[diagnostic(code(hop::invalid_patch))]
    InvalidPatch { path: PathBuf, reason: String },

    #[error("Invalid release manifest {}: {reason}", path.display())]
    #[diagnostic(
        code(hop::manifest),
        help("Check the release.toml file or restore it from version control")
    )]
    Manifest { path: PathBuf, reason: String },

    #[error("git {command} failed: {stderr}")]
    #[diagnostic(code(hop::git), help("Check the state of the git repository"))]
    Git { command: String, stderr: String },

    #[error("Package generator failed: {0}")]
    #[diagnostic(code(hop::generator))]
    Generator(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lock(#[from] LockError),

    #[error("Error while {action}")]
    #[diagnostic(code(hop::io), help("Check file permissions and disk space"))]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Thread lock poison error")]
    #[diagnostic(
        code(hop::poison),
        help("This is an internal error, please report it")
    )]
    PoisonError,

    #[error("{0}")]
    #[diagnostic(code(hop::error))]
    Custom(String),
}

impl HopError {
    /// Whether this error is reported as a warning instead of failing the operation.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::PackageSyncFailed { .. } | Self::PushFailed { .. }
        )
    }

    /// Wraps any error as a package divergence warning.
    pub fn into_package_sync_warning(self) -> Self {
        match self {
            err @ Self::PackageSyncFailed { .. } => err,
            err => {
                Self::PackageSyncFailed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

impl From<diesel::result::Error> for HopError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(err.into())
    }
}

impl<T> From<std::sync::PoisonError<T>> for HopError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::PoisonError
    }
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, HopError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, HopError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            HopError::Io {
                action: context(),
                source: err,
            }
        })
    }
}
