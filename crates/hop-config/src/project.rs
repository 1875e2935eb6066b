use std::path::{Path, PathBuf};

use documented::{Documented, DocumentedFields};
use hop_utils::fs::{read_file, write_file};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
    HOP_DIR,
};

pub const PROJECT_CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_PATCHES_DIR: &str = "Patches";
pub const DEFAULT_MAIN_BRANCH: &str = "hop_main";
pub const DEFAULT_REMOTE: &str = "origin";

/// Project configuration, committed with the repository.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct ProjectConfig {
    /// Name of the generated package.
    pub package_name: String,

    /// Whether this repository authors schema patches.
    /// A repository with devel = false only keeps its package in sync
    /// with the database.
    pub devel: bool,

    /// Directory holding one sub-directory per release, laid out as
    /// <major>/<minor>/<patch>.
    /// Default: Patches
    pub patches_dir: Option<String>,

    /// Directory the package snapshot is written to.
    /// Default: the package name
    pub package_dir: Option<String>,

    /// Branch that receives committed releases.
    /// Default: hop_main
    pub main_branch: Option<String>,

    /// Git remote used by `hop release --push`.
    /// Default: origin
    pub remote: Option<String>,

    /// Command run after the schema snapshot is written, with
    /// HOP_SCHEMA_FILE pointing at the snapshot.
    /// Example: ["python", "-m", "codegen"]
    pub generator: Option<Vec<String>>,
}

impl ProjectConfig {
    /// Creates the default configuration for a new package.
    pub fn new(package_name: &str, devel: bool) -> Result<Self> {
        let mut config = Self {
            package_name: package_name.to_string(),
            devel,
            patches_dir: None,
            package_dir: None,
            main_branch: None,
            remote: None,
            generator: None,
        };
        config.resolve()?;
        Ok(config)
    }

    /// Path of the project configuration file inside `root`.
    pub fn path(root: &Path) -> PathBuf {
        root.join(HOP_DIR).join(PROJECT_CONFIG_FILE)
    }

    /// Whether `root` contains a hop project configuration.
    pub fn is_initialized(root: &Path) -> bool {
        Self::path(root).is_file()
    }

    /// Loads the configuration from `root/.hop/config.toml`.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.is_file() {
            return Err(ConfigError::NotInitialized(path));
        }

        debug!(path = %path.display(), "loading project config");
        let content = read_file(&path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.resolve()?;
        Ok(config)
    }

    /// Validates the package name and fills unset fields with their defaults.
    pub fn resolve(&mut self) -> Result<()> {
        validate_package_name(&self.package_name)?;

        self.patches_dir
            .get_or_insert_with(|| DEFAULT_PATCHES_DIR.to_string());
        self.package_dir
            .get_or_insert_with(|| self.package_name.clone());
        self.main_branch
            .get_or_insert_with(|| DEFAULT_MAIN_BRANCH.to_string());
        self.remote.get_or_insert_with(|| DEFAULT_REMOTE.to_string());

        if self.generator.as_ref().is_some_and(Vec::is_empty) {
            self.generator = None;
        }

        Ok(())
    }

    pub fn patches_dir(&self) -> &str {
        self.patches_dir.as_deref().unwrap_or(DEFAULT_PATCHES_DIR)
    }

    pub fn package_dir(&self) -> &str {
        self.package_dir.as_deref().unwrap_or(&self.package_name)
    }

    pub fn main_branch(&self) -> &str {
        self.main_branch.as_deref().unwrap_or(DEFAULT_MAIN_BRANCH)
    }

    pub fn remote(&self) -> &str {
        self.remote.as_deref().unwrap_or(DEFAULT_REMOTE)
    }

    pub fn generator(&self) -> Option<&[String]> {
        self.generator.as_deref()
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<ProjectConfig>(doc.as_table_mut(), true)?;

        Ok(doc)
    }

    /// Writes the annotated configuration to `root/.hop/config.toml`.
    ///
    /// Refuses to overwrite an existing file.
    pub fn generate(&self, root: &Path) -> Result<PathBuf> {
        let path = Self::path(root);
        if path.exists() {
            return Err(ConfigError::ConfigAlreadyExists(path));
        }

        let doc = self.to_annotated_document()?;
        write_file(&path, doc.to_string())?;
        info!("Project configuration written to {}", path.display());
        Ok(path)
    }
}

fn validate_package_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidPackageName(name.to_string()))
    }
}
