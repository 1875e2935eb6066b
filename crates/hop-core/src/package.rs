//! Package regeneration from the live schema.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use hop_utils::fs::{ensure_dir_exists, write_file};
use tracing::{debug, info};

use crate::{
    constants::{ENV_SCHEMA_FILE, PACKAGE_JSON_FILE, PACKAGE_SQL_FILE},
    database::SchemaSnapshot,
    error::{ErrorContext, HopError},
    HopResult,
};

/// Files written by a regeneration, relative to the repository root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageWriteResult {
    pub files: Vec<PathBuf>,
    /// Whether any file content differs from what was there before.
    pub changed: bool,
}

/// Turns a schema snapshot into the generated package.
pub trait PackageGenerator: Send + Sync {
    fn regenerate(&self, snapshot: &SchemaSnapshot) -> HopResult<PackageWriteResult>;

    /// Package directory relative to the repository root.
    fn package_dir(&self) -> &Path;
}

/// Writes `schema.sql` and `schema.json`, then runs the configured generator.
pub struct SnapshotGenerator {
    root: PathBuf,
    package_dir: PathBuf,
    command: Option<Vec<String>>,
}

impl SnapshotGenerator {
    pub fn new(
        root: impl Into<PathBuf>,
        package_dir: impl Into<PathBuf>,
        command: Option<Vec<String>>,
    ) -> Self {
        Self {
            root: root.into(),
            package_dir: package_dir.into(),
            command: command.filter(|c| !c.is_empty()),
        }
    }

    /// Writes `content` to `relative` unless it is already there.
    fn write_if_changed(&self, relative: &Path, content: &str) -> HopResult<bool> {
        let path = self.root.join(relative);
        if std::fs::read_to_string(&path).is_ok_and(|existing| existing == content) {
            return Ok(false);
        }
        write_file(&path, content)?;
        Ok(true)
    }

    fn run_command(&self, command: &[String], schema_file: &Path) -> HopResult<()> {
        let Some((program, args)) = command.split_first() else {
            return Ok(());
        };

        debug!(program = %program, "running package generator");
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .env(ENV_SCHEMA_FILE, schema_file)
            .output()
            .with_context(|| format!("running package generator {program}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{}: {stderr}", output.status)
            };
            return Err(HopError::Generator(reason));
        }
        Ok(())
    }
}

impl PackageGenerator for SnapshotGenerator {
    fn regenerate(&self, snapshot: &SchemaSnapshot) -> HopResult<PackageWriteResult> {
        ensure_dir_exists(self.root.join(&self.package_dir))?;

        let sql_file = self.package_dir.join(PACKAGE_SQL_FILE);
        let json_file = self.package_dir.join(PACKAGE_JSON_FILE);

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|err| HopError::Generator(format!("failed to encode snapshot: {err}")))?;

        let mut changed = self.write_if_changed(&sql_file, &snapshot.render_sql())?;
        changed |= self.write_if_changed(&json_file, &format!("{json}\n"))?;

        if let Some(command) = &self.command {
            self.run_command(command, &self.root.join(&sql_file))?;
        }

        if changed {
            info!(
                "Package {} regenerated ({} objects)",
                self.package_dir.display(),
                snapshot.objects.len()
            );
        }

        Ok(PackageWriteResult {
            files: vec![sql_file, json_file],
            changed,
        })
    }

    fn package_dir(&self) -> &Path {
        &self.package_dir
    }
}

#[cfg(test)]
mod tests {
    use hop_db::snapshot::SchemaObject;

    use super::*;

    fn snapshot() -> SchemaSnapshot {
        SchemaSnapshot::from_objects(vec![SchemaObject {
            kind: "table".into(),
            name: "users".into(),
            table_name: "users".into(),
            sql: Some("CREATE TABLE users (id INTEGER PRIMARY KEY)".into()),
        }])
    }

    #[test]
    fn test_regenerate_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let generator = SnapshotGenerator::new(dir.path(), "blog", None);

        let result = generator.regenerate(&snapshot()).unwrap();
        assert!(result.changed);
        assert_eq!(
            result.files,
            vec![PathBuf::from("blog/schema.sql"), PathBuf::from("blog/schema.json")]
        );

        let sql = std::fs::read_to_string(dir.path().join("blog/schema.sql")).unwrap();
        assert!(sql.contains("CREATE TABLE users"));
        let json = std::fs::read_to_string(dir.path().join("blog/schema.json")).unwrap();
        assert!(json.contains("\"digest\""));
    }

    #[test]
    fn test_regenerate_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let generator = SnapshotGenerator::new(dir.path(), "blog", None);

        generator.regenerate(&snapshot()).unwrap();
        let again = generator.regenerate(&snapshot()).unwrap();
        assert!(!again.changed);

        let empty = generator
            .regenerate(&SchemaSnapshot::from_objects(Vec::new()))
            .unwrap();
        assert!(empty.changed);
    }

    #[cfg(unix)]
    #[test]
    fn test_generator_command() {
        let dir = tempfile::tempdir().unwrap();
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "cp \"$HOP_SCHEMA_FILE\" copied.sql".to_string(),
        ];
        let generator = SnapshotGenerator::new(dir.path(), "blog", Some(command));

        generator.regenerate(&snapshot()).unwrap();
        assert!(dir.path().join("copied.sql").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_generator_command_failure() {
        let dir = tempfile::tempdir().unwrap();
        let command = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let generator = SnapshotGenerator::new(dir.path(), "blog", Some(command));

        let err = generator.regenerate(&snapshot()).unwrap_err();
        assert!(matches!(err, HopError::Generator(_)));
        // the snapshot files are written before the command runs
        assert!(dir.path().join("blog/schema.sql").exists());
    }
}
