//! Constants used throughout hop-core.

/// Prefix of release branches (`hop_1.3.0`).
pub const BRANCH_PREFIX: &str = "hop_";

/// Prefix of release tags (`v1.3.0`).
pub const TAG_PREFIX: &str = "v";

/// Manifest file inside every release directory.
pub const MANIFEST_FILE: &str = "release.toml";

/// Rendered schema written to the package directory.
pub const PACKAGE_SQL_FILE: &str = "schema.sql";

/// Machine-readable schema written to the package directory.
pub const PACKAGE_JSON_FILE: &str = "schema.json";

/// Environment variable handed to the external package generator.
pub const ENV_SCHEMA_FILE: &str = "HOP_SCHEMA_FILE";

/// Name of the repository lock file.
pub const LOCK_NAME: &str = "hop";
