pub mod annotations;
pub mod error;
pub mod instance;
pub mod project;

#[cfg(test)]
pub mod test_utils;

/// Directory holding hop's per-repository configuration.
pub const HOP_DIR: &str = ".hop";

pub use error::{ConfigError, Result};
pub use instance::InstanceConfig;
pub use project::ProjectConfig;
