use std::path::{Path, PathBuf};

use hop_utils::fs::{read_file, write_file};
use serde::{Deserialize, Serialize};

use crate::{error::HopError, release::ReleaseId, HopResult};

/// Contents of a release's `release.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Manifest {
    pub release: ReleaseId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created: String,
    #[serde(default)]
    pub patches: Vec<PatchEntry>,
}

/// One staged patch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatchEntry {
    pub ordinal: u32,
    pub name: String,
    pub file: String,
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_checksum: Option<String>,
}

impl Manifest {
    pub fn new(release: ReleaseId, message: Option<String>) -> Self {
        Self {
            release,
            message,
            created: chrono::Utc::now().to_rfc3339(),
            patches: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> HopResult<Self> {
        let content = read_file(path)?;
        toml::from_str(&content).map_err(|err| {
            HopError::Manifest {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        })
    }

    pub fn save(&self, path: &Path) -> HopResult<()> {
        let content = toml::to_string_pretty(self).map_err(|err| {
            HopError::Manifest {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        })?;
        write_file(path, content)?;
        Ok(())
    }

    /// Ordinal the next staged patch receives.
    pub fn next_ordinal(&self) -> u32 {
        self.patches.iter().map(|p| p.ordinal).max().unwrap_or(0) + 1
    }

    pub fn find(&self, name: &str) -> Option<&PatchEntry> {
        self.patches.iter().find(|p| p.name == name)
    }

    /// Inserts `entry`, replacing any entry with the same ordinal.
    pub fn upsert(&mut self, entry: PatchEntry) {
        match self.patches.iter_mut().find(|p| p.ordinal == entry.ordinal) {
            Some(existing) => *existing = entry,
            None => self.patches.push(entry),
        }
        self.patches.sort_by_key(|p| p.ordinal);
    }

    /// Checks that ordinals run 1..=n without gaps or duplicates.
    pub fn check_contiguous(&self) -> Result<(), String> {
        let mut ordinals: Vec<u32> = self.patches.iter().map(|p| p.ordinal).collect();
        ordinals.sort_unstable();
        for (index, ordinal) in ordinals.iter().enumerate() {
            let expected = index as u32 + 1;
            if *ordinal != expected {
                return Err(format!("expected patch {expected}, found patch {ordinal}"));
            }
        }
        Ok(())
    }
}

impl PatchEntry {
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file)
    }

    pub fn down_path_in(&self, dir: &Path) -> Option<PathBuf> {
        self.down_file.as_ref().map(|file| dir.join(file))
    }
}
