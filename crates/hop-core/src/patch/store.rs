//! Filesystem patch store.
//!
//! Every release owns `<patches_dir>/<major>/<minor>/<patch>/` with a
//! `release.toml` manifest and its scripts, named `NNN-<name>.sql` with an
//! optional `NNN-<name>.down.sql` inverse.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use hop_utils::{
    fs::{copy_file, ensure_dir_exists, read_file, safe_remove},
    hash::{calculate_checksum, checksum_bytes},
};
use regex::Regex;
use tracing::{debug, warn};

use super::{Artifact, Manifest, Patch, PatchEntry, PatchStore};
use crate::{constants::MANIFEST_FILE, error::HopError, release::ReleaseId, HopResult};

static ORDINAL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[-_]").expect("valid ordinal prefix regex"));

pub struct FsPatchStore {
    root: PathBuf,
}

impl FsPatchStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_path(&self, id: &ReleaseId) -> PathBuf {
        self.release_dir(id).join(MANIFEST_FILE)
    }

    fn require_manifest(&self, id: &ReleaseId) -> HopResult<Manifest> {
        let manifest = self.load_manifest(id)?.ok_or_else(|| {
            HopError::NonContiguousHistory {
                release: id.to_string(),
                detail: format!("{} is missing", self.manifest_path(id).display()),
            }
        })?;

        if manifest.release.base() != id.base() {
            return Err(HopError::Manifest {
                path: self.manifest_path(id),
                reason: format!("describes release {}, expected {}", manifest.release, id),
            });
        }

        Ok(manifest)
    }

    fn to_patch(&self, id: &ReleaseId, dir: &Path, entry: &PatchEntry) -> Patch {
        let inverse = match (entry.down_path_in(dir), &entry.down_checksum) {
            (Some(path), Some(checksum)) => {
                Some(Artifact {
                    path,
                    checksum: checksum.clone(),
                })
            }
            _ => None,
        };

        Patch {
            release: id.clone(),
            ordinal: entry.ordinal,
            name: entry.name.clone(),
            forward: Artifact {
                path: entry.path_in(dir),
                checksum: entry.checksum.clone(),
            },
            inverse,
            applied: false,
        }
    }

    fn read_verified(&self, patch: &Patch, artifact: &Artifact) -> HopResult<String> {
        let content = read_file(&artifact.path)?;
        let actual = checksum_bytes(content.as_bytes());
        if !actual.eq_ignore_ascii_case(&artifact.checksum) {
            return Err(HopError::ChecksumMismatch {
                release: patch.release.to_string(),
                ordinal: patch.ordinal,
                expected: artifact.checksum.clone(),
                actual,
            });
        }
        Ok(content)
    }
}

/// Derives a patch name from a script file name.
///
/// `001-add_users.sql` and `add users.sql` both become `add_users`.
pub fn patch_name(source: &Path) -> Option<String> {
    let file_name = source.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(".sql").unwrap_or(file_name);
    let stem = stem.strip_suffix(".up").unwrap_or(stem);
    let stem = ORDINAL_PREFIX_RE.replace(stem, "");

    let name: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    (!name.trim_matches('_').is_empty()).then_some(name)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl PatchStore for FsPatchStore {
    fn release_dir(&self, id: &ReleaseId) -> PathBuf {
        self.root
            .join(id.major.to_string())
            .join(id.minor.to_string())
            .join(id.patch.to_string())
    }

    fn create_release(&self, id: &ReleaseId, message: Option<&str>) -> HopResult<PathBuf> {
        let dir = self.release_dir(id);
        if dir.exists() {
            warn!(dir = %dir.display(), "discarding leftover release directory");
            safe_remove(&dir)?;
        }
        ensure_dir_exists(&dir)?;

        Manifest::new(id.base(), message.map(str::to_string)).save(&dir.join(MANIFEST_FILE))?;
        debug!(release = %id, dir = %dir.display(), "created release directory");
        Ok(dir)
    }

    fn load_manifest(&self, id: &ReleaseId) -> HopResult<Option<Manifest>> {
        let path = self.manifest_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        Manifest::load(&path).map(Some)
    }

    fn patches_for(&self, id: &ReleaseId) -> HopResult<Vec<Patch>> {
        let manifest = self.require_manifest(id)?;
        manifest.check_contiguous().map_err(|detail| {
            HopError::NonContiguousHistory {
                release: id.to_string(),
                detail,
            }
        })?;

        let dir = self.release_dir(id);
        let mut patches = Vec::with_capacity(manifest.patches.len());
        for entry in &manifest.patches {
            let patch = self.to_patch(id, &dir, entry);
            let missing = std::iter::once(&patch.forward)
                .chain(patch.inverse.as_ref())
                .find(|artifact| !artifact.path.is_file());
            if let Some(artifact) = missing {
                return Err(HopError::NonContiguousHistory {
                    release: id.to_string(),
                    detail: format!("{} is missing", artifact.path.display()),
                });
            }
            patches.push(patch);
        }

        patches.sort_by_key(|p| p.ordinal);
        Ok(patches)
    }

    fn stage(&self, id: &ReleaseId, source: &Path, inverse: Option<&Path>) -> HopResult<Patch> {
        let mut manifest = self.require_manifest(id)?;

        for path in std::iter::once(source).chain(inverse) {
            if !path.is_file() {
                return Err(HopError::InvalidPatch {
                    path: path.to_path_buf(),
                    reason: "not a file".into(),
                });
            }
        }

        let name = patch_name(source).ok_or_else(|| {
            HopError::InvalidPatch {
                path: source.to_path_buf(),
                reason: "cannot derive a patch name from the file name".into(),
            }
        })?;

        let existing = manifest.find(&name).cloned();
        let ordinal = existing
            .as_ref()
            .map(|e| e.ordinal)
            .unwrap_or_else(|| manifest.next_ordinal());

        let dir = self.release_dir(id);
        let file = format!("{ordinal:03}-{name}.sql");
        let target = dir.join(&file);
        if !same_file(source, &target) {
            copy_file(source, &target)?;
        }

        let (down_file, down_checksum) = match inverse {
            Some(inverse) => {
                let down_file = format!("{ordinal:03}-{name}.down.sql");
                let down_target = dir.join(&down_file);
                if !same_file(inverse, &down_target) {
                    copy_file(inverse, &down_target)?;
                }
                (Some(down_file), Some(calculate_checksum(&down_target)?))
            }
            None => {
                existing
                    .map(|e| (e.down_file, e.down_checksum))
                    .unwrap_or((None, None))
            }
        };

        let entry = PatchEntry {
            ordinal,
            name,
            file,
            checksum: calculate_checksum(&target)?,
            down_file,
            down_checksum,
        };
        let patch = self.to_patch(id, &dir, &entry);

        manifest.upsert(entry);
        manifest.save(&self.manifest_path(id))?;

        debug!(release = %id, ordinal, name = %patch.name, "staged patch");
        Ok(patch)
    }

    fn read_forward(&self, patch: &Patch) -> HopResult<String> {
        self.read_verified(patch, &patch.forward)
    }

    fn read_inverse(&self, patch: &Patch) -> HopResult<String> {
        let inverse = patch.inverse.as_ref().ok_or_else(|| {
            HopError::IrreversiblePatch {
                release: patch.release.to_string(),
                ordinal: patch.ordinal,
                name: patch.name.clone(),
            }
        })?;
        self.read_verified(patch, inverse)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn setup() -> (tempfile::TempDir, FsPatchStore, ReleaseId) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPatchStore::new(dir.path().join("Patches"));
        let id = ReleaseId::new(1, 3, 0);
        store.create_release(&id, Some("users")).unwrap();
        (dir, store, id)
    }

    fn script(dir: &Path, name: &str, sql: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, sql).unwrap();
        path
    }

    #[test]
    fn test_patch_name() {
        assert_eq!(patch_name(Path::new("add_users.sql")).unwrap(), "add_users");
        assert_eq!(patch_name(Path::new("/x/002-add_users.sql")).unwrap(), "add_users");
        assert_eq!(patch_name(Path::new("add users.up.sql")).unwrap(), "add_users");
        assert!(patch_name(Path::new(".sql")).is_none());
    }

    #[test]
    fn test_layout() {
        let (dir, store, id) = setup();
        assert_eq!(store.release_dir(&id), dir.path().join("Patches/1/3/0"));
        assert!(dir.path().join("Patches/1/3/0/release.toml").is_file());
        assert!(store.patches_for(&id).unwrap().is_empty());
    }

    #[test]
    fn test_stage_assigns_ordinals() {
        let (dir, store, id) = setup();
        let a = script(dir.path(), "add_users.sql", "CREATE TABLE users (id INTEGER);");
        let b = script(dir.path(), "add_posts.sql", "CREATE TABLE posts (id INTEGER);");
        let b_down = script(dir.path(), "drop_posts.sql", "DROP TABLE posts;");

        let first = store.stage(&id, &a, None).unwrap();
        let second = store.stage(&id, &b, Some(&b_down)).unwrap();

        assert_eq!(first.ordinal, 1);
        assert!(!first.is_reversible());
        assert_eq!(second.ordinal, 2);
        assert!(second.is_reversible());

        let patches = store.patches_for(&id).unwrap();
        let files: Vec<_> = patches
            .iter()
            .map(|p| p.forward.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, vec!["001-add_users.sql", "002-add_posts.sql"]);
        assert_eq!(
            store.read_inverse(&patches[1]).unwrap(),
            "DROP TABLE posts;"
        );
    }

    #[test]
    fn test_restage_refreshes_existing_patch() {
        let (dir, store, id) = setup();
        let a = script(dir.path(), "add_users.sql", "CREATE TABLE users (id INTEGER);");
        let a_down = script(dir.path(), "drop_users.sql", "DROP TABLE users;");
        store.stage(&id, &a, Some(&a_down)).unwrap();

        fs::write(&a, "CREATE TABLE users (id INTEGER, email TEXT);").unwrap();
        let refreshed = store.stage(&id, &a, None).unwrap();

        assert_eq!(refreshed.ordinal, 1);
        assert!(refreshed.is_reversible());
        let patches = store.patches_for(&id).unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(
            store.read_forward(&patches[0]).unwrap(),
            "CREATE TABLE users (id INTEGER, email TEXT);"
        );
    }

    #[test]
    fn test_tampered_patch_is_detected() {
        let (dir, store, id) = setup();
        let a = script(dir.path(), "add_users.sql", "CREATE TABLE users (id INTEGER);");
        let patch = store.stage(&id, &a, None).unwrap();

        fs::write(&patch.forward.path, "DROP TABLE accounts;").unwrap();

        let err = store.read_forward(&patch).unwrap_err();
        assert!(matches!(err, HopError::ChecksumMismatch { ordinal: 1, .. }));
    }

    #[test]
    fn test_missing_inverse_is_irreversible() {
        let (dir, store, id) = setup();
        let a = script(dir.path(), "add_users.sql", "CREATE TABLE users (id INTEGER);");
        let patch = store.stage(&id, &a, None).unwrap();

        let err = store.read_inverse(&patch).unwrap_err();
        assert!(matches!(err, HopError::IrreversiblePatch { ordinal: 1, .. }));
    }

    #[test]
    fn test_missing_release_is_non_contiguous() {
        let (_dir, store, _) = setup();
        let err = store.patches_for(&ReleaseId::new(9, 9, 9)).unwrap_err();
        assert!(matches!(err, HopError::NonContiguousHistory { .. }));
    }

    #[test]
    fn test_missing_patch_file_is_non_contiguous() {
        let (dir, store, id) = setup();
        let a = script(dir.path(), "add_users.sql", "CREATE TABLE users (id INTEGER);");
        let patch = store.stage(&id, &a, None).unwrap();
        fs::remove_file(&patch.forward.path).unwrap();

        let err = store.patches_for(&id).unwrap_err();
        assert!(matches!(err, HopError::NonContiguousHistory { .. }));
    }

    #[test]
    fn test_stage_rejects_missing_source() {
        let (dir, store, id) = setup();
        let err = store
            .stage(&id, &dir.path().join("nope.sql"), None)
            .unwrap_err();
        assert!(matches!(err, HopError::InvalidPatch { .. }));
    }

    #[test]
    fn test_create_release_replaces_leftovers() {
        let (dir, store, id) = setup();
        let a = script(dir.path(), "add_users.sql", "CREATE TABLE users (id INTEGER);");
        store.stage(&id, &a, None).unwrap();

        store.create_release(&id, None).unwrap();

        assert!(store.patches_for(&id).unwrap().is_empty());
        assert!(!store.release_dir(&id).join("001-add_users.sql").exists());
    }
}
