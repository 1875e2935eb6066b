//! Patch artifacts and the store that owns them.

use std::path::{Path, PathBuf};

use crate::{release::ReleaseId, HopResult};

pub mod manifest;
pub mod store;

pub use manifest::{Manifest, PatchEntry};
pub use store::FsPatchStore;

/// Script file and its recorded checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub checksum: String,
}

/// A single schema change belonging to exactly one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub release: ReleaseId,
    pub ordinal: u32,
    pub name: String,
    pub forward: Artifact,
    pub inverse: Option<Artifact>,
    pub applied: bool,
}

impl Patch {
    pub fn is_reversible(&self) -> bool {
        self.inverse.is_some()
    }
}

/// Ordered patch artifacts, keyed by release.
pub trait PatchStore: Send + Sync {
    /// Directory holding the artifacts of `id`.
    fn release_dir(&self, id: &ReleaseId) -> PathBuf;

    /// Creates an empty release directory with its manifest.
    fn create_release(&self, id: &ReleaseId, message: Option<&str>) -> HopResult<PathBuf>;

    /// Manifest of `id`, if the release directory exists.
    fn load_manifest(&self, id: &ReleaseId) -> HopResult<Option<Manifest>>;

    /// Patches of `id` in ascending ordinal order.
    fn patches_for(&self, id: &ReleaseId) -> HopResult<Vec<Patch>>;

    /// Copies `source` (and its optional inverse) into the release.
    fn stage(&self, id: &ReleaseId, source: &Path, inverse: Option<&Path>) -> HopResult<Patch>;

    /// Forward script of `patch`, after checksum verification.
    fn read_forward(&self, patch: &Patch) -> HopResult<String>;

    /// Inverse script of `patch`, after checksum verification.
    fn read_inverse(&self, patch: &Patch) -> HopResult<String>;
}
