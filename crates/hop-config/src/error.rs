use std::path::PathBuf;

use hop_utils::error::{FileSystemError, UtilsError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(hop_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(hop_config::toml_deserialize),
        help("Check the syntax and structure of the files under .hop/")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists: {}", .0.display())]
    #[diagnostic(
        code(hop_config::already_exists),
        help("Remove the existing file or choose another directory")
    )]
    ConfigAlreadyExists(PathBuf),

    #[error("Not in a hop repository: {} is missing", .0.display())]
    #[diagnostic(
        code(hop_config::not_initialized),
        help("Try hop new [--devel] <package name>")
    )]
    NotInitialized(PathBuf),

    #[error("Invalid package name: {0:?}")]
    #[diagnostic(
        code(hop_config::invalid_package_name),
        help("Package names may only contain letters, digits, `_` and `-`")
    )]
    InvalidPackageName(String),

    #[error("Invalid value for {key}: {value:?}")]
    #[diagnostic(
        code(hop_config::invalid_value),
        help("Use one of: true, false, 1, 0, yes, no")
    )]
    InvalidValue { key: String, value: String },

    #[error("IO error: {0}")]
    #[diagnostic(code(hop_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(hop_config::utils))]
    Utils(#[from] UtilsError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(hop_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(hop_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

impl From<FileSystemError> for ConfigError {
    fn from(err: FileSystemError) -> Self {
        Self::Utils(UtilsError::FileSystem(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
