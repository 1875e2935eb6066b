use std::path::{Path, PathBuf};

use documented::{Documented, DocumentedFields};
use hop_utils::fs::{read_file, write_file};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
    project::ProjectConfig,
    HOP_DIR,
};

pub const INSTANCE_CONFIG_FILE: &str = "local.toml";

pub const ENV_DATABASE: &str = "HOP_DATABASE";
pub const ENV_PRODUCTION: &str = "HOP_PRODUCTION";

/// Configuration of this clone of the repository. Not committed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct InstanceConfig {
    /// Path of the SQLite database bound to this clone, relative to the
    /// repository root unless absolute.
    /// Overridden by HOP_DATABASE.
    pub database: String,

    /// Whether this clone serves a production database. Production clones
    /// only accept `upgrade` and `restore`.
    /// Overridden by HOP_PRODUCTION.
    /// Default: false
    pub production: Option<bool>,
}

impl InstanceConfig {
    /// Default instance configuration for a project.
    pub fn default_for(project: &ProjectConfig) -> Self {
        Self {
            database: format!("{}/{}.sqlite3", HOP_DIR, project.package_name),
            production: Some(false),
        }
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(HOP_DIR).join(INSTANCE_CONFIG_FILE)
    }

    /// Loads `root/.hop/local.toml`, falling back to the project defaults when
    /// the file is absent, then applies environment overrides.
    pub fn load(root: &Path, project: &ProjectConfig) -> Result<Self> {
        let path = Self::path(root);

        let mut config = if path.is_file() {
            debug!(path = %path.display(), "loading instance config");
            toml::from_str(&read_file(&path)?)?
        } else {
            debug!(path = %path.display(), "no instance config, using defaults");
            Self::default_for(project)
        };

        config.apply_env_overrides()?;
        config.production.get_or_insert(false);
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(database) = std::env::var(ENV_DATABASE) {
            if !database.is_empty() {
                self.database = database;
            }
        }

        if let Ok(value) = std::env::var(ENV_PRODUCTION) {
            self.production = Some(parse_flag(ENV_PRODUCTION, &value)?);
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.production.unwrap_or(false)
    }

    /// Absolute path of the bound database.
    pub fn database_path(&self, root: &Path) -> PathBuf {
        let database = Path::new(&self.database);
        if database.is_absolute() {
            database.to_path_buf()
        } else {
            root.join(database)
        }
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;
        annotate_toml_table::<InstanceConfig>(doc.as_table_mut(), true)?;
        Ok(doc)
    }

    /// Writes the annotated configuration to `root/.hop/local.toml`.
    pub fn save(&self, root: &Path) -> Result<PathBuf> {
        let path = Self::path(root);
        write_file(&path, self.to_annotated_document()?.to_string())?;
        info!("Instance configuration written to {}", path.display());
        Ok(path)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        }
    }
}
