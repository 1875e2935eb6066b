use std::path::{Path, PathBuf};

use hop_config::{error::ConfigError, InstanceConfig, ProjectConfig};
use hop_core::{
    database::{Database, DieselDatabase, ReleaseStatus},
    environment::Operation,
    error::HopError,
    package::{PackageGenerator, SnapshotGenerator},
    patch::{FsPatchStore, PatchStore},
    release::ReleaseId,
    vcs::{SystemGit, VersionControl},
    HopResult,
};
use hop_events::{EventSinkHandle, HopEvent, ReleaseStage};
use hop_utils::fs::{ensure_dir_exists, write_file};
use tracing::debug;

use crate::{HopContext, InitReport};

const GITIGNORE: &str = "# hop: per-clone settings and databases\n.hop/local.toml\n.hop/*.sqlite3*\n";

/// Scaffold a new hop repository `<parent>/<name>`.
///
/// Creates the git repository on the main branch, the project and instance
/// configuration, the database with its bookkeeping tables, and the initial
/// release `0.0.0`, committed and tagged.
pub fn new_package(
    parent: &Path,
    name: &str,
    devel: bool,
    events: EventSinkHandle,
) -> HopResult<InitReport> {
    let project = ProjectConfig::new(name, devel)?;

    if let Some(existing) = HopContext::discover(parent) {
        return Err(HopError::OperationNotAllowed {
            operation: Operation::New.to_string(),
            state: format!("inside the hop repository {}", existing.display()),
        });
    }

    let root = parent.join(name);
    if ProjectConfig::is_initialized(&root) {
        return Err(ConfigError::ConfigAlreadyExists(ProjectConfig::path(&root)).into());
    }
    ensure_dir_exists(&root)?;
    debug!(root = %root.display(), devel, "creating hop repository");

    let git = SystemGit::init(&root, project.main_branch())?;

    let config_path = project.generate(&root)?;
    let instance = InstanceConfig::default_for(&project);
    instance.save(&root)?;
    let gitignore = root.join(".gitignore");
    write_file(&gitignore, GITIGNORE)?;

    let database = DieselDatabase::open(instance.database_path(&root))?;
    let release = ReleaseId::initial();

    let patches = FsPatchStore::new(root.join(project.patches_dir()));
    let release_dir = patches.create_release(&release, Some("initial release"))?;
    database.set_release_status(&release, ReleaseStatus::Applied)?;

    let mut warnings = Vec::new();
    let generator = SnapshotGenerator::new(
        &root,
        project.package_dir(),
        project.generator().map(<[String]>::to_vec),
    );
    let package_files = match database
        .schema_snapshot()
        .and_then(|snapshot| generator.regenerate(&snapshot))
    {
        Ok(result) => {
            events.emit(HopEvent::PackageRegenerated {
                files: result.files.clone(),
                changed: result.changed,
            });
            result.files
        }
        Err(err) => {
            let warning = err.into_package_sync_warning();
            debug!("{warning}");
            warnings.push(warning);
            Vec::new()
        }
    };

    let relative = |path: &Path| -> PathBuf {
        path.strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut paths = vec![
        relative(&config_path),
        relative(&gitignore),
        relative(&release_dir),
    ];
    paths.extend(package_files);
    debug!(files = paths.len(), "committing new repository");

    git.commit(&format!("[hop] new package {name}"), &paths)?;
    let tag = release.tag_name();
    git.tag(&tag, &git.head()?)?;

    events.emit(HopEvent::Release {
        release: release.to_string(),
        stage: ReleaseStage::Committed { tag: tag.clone() },
    });
    events.emit(HopEvent::BindingUpdated {
        release: Some(release.to_string()),
    });
    debug!("Created hop repository {}", root.display());

    Ok(InitReport {
        root,
        release,
        tag,
        warnings,
    })
}
