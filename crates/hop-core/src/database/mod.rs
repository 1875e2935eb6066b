//! Database adapter.

pub use hop_db::models::ReleaseStatus;
pub use hop_db::snapshot::{SchemaObject, SchemaSnapshot};

use crate::{patch::Patch, release::ReleaseId, HopResult};

pub mod connection;

pub use connection::DieselDatabase;

/// A patch recorded as applied in the bookkeeping tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    pub ordinal: u32,
    pub name: String,
    pub checksum: String,
}

/// Transactional patch application against the bound database.
pub trait Database: Send + Sync {
    /// Highest release whose status is `applied`.
    fn last_applied_release(&self) -> HopResult<Option<ReleaseId>>;

    fn release_status(&self, id: &ReleaseId) -> HopResult<Option<ReleaseStatus>>;

    /// Releases whose last recorded outcome is a failure, ascending.
    fn failed_releases(&self) -> HopResult<Vec<ReleaseId>>;

    /// Applied patches of `id` in ordinal order.
    fn applied_patches(&self, id: &ReleaseId) -> HopResult<Vec<AppliedPatch>>;

    /// Runs `sql` and records `patch` in one transaction.
    fn apply_patch(&self, patch: &Patch, sql: &str) -> HopResult<()>;

    /// Runs the inverse `sql` and forgets `patch` in one transaction.
    fn revert_patch(&self, patch: &Patch, sql: &str) -> HopResult<()>;

    fn set_release_status(&self, id: &ReleaseId, status: ReleaseStatus) -> HopResult<()>;

    /// Current user schema, without the bookkeeping tables.
    fn schema_snapshot(&self) -> HopResult<SchemaSnapshot>;
}
