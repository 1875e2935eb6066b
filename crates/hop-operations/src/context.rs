//! Operation context shared by every hop operation.

use std::path::{Path, PathBuf};

use hop_config::{InstanceConfig, ProjectConfig};
use hop_core::{
    constants::LOCK_NAME,
    database::{Database, DieselDatabase},
    environment::{classify, Observations, RepositoryState},
    error::HopError,
    package::{PackageGenerator, PackageWriteResult, SnapshotGenerator},
    patch::{FsPatchStore, PatchStore},
    vcs::{committed_releases, SystemGit, VersionControl},
    HopResult,
};
use hop_events::{EventSinkHandle, HopEvent};
use hop_utils::lock::FileLock;
use tracing::{debug, trace};

/// Collaborators a [`HopContext`] is assembled from.
pub struct ContextParts {
    pub root: PathBuf,
    pub project: ProjectConfig,
    pub instance: InstanceConfig,
    pub vcs: Box<dyn VersionControl>,
    pub database: Box<dyn Database>,
    pub patches: Box<dyn PatchStore>,
    pub generator: Box<dyn PackageGenerator>,
    pub events: EventSinkHandle,
    /// Directory holding the repository lock file.
    pub lock_dir: PathBuf,
}

/// Everything an operation needs: configuration, the four collaborators and
/// the event sink.
///
/// Nothing here is cached between invocations; repository state is derived
/// from version control and the database each time it is asked for.
pub struct HopContext {
    root: PathBuf,
    project: ProjectConfig,
    instance: InstanceConfig,
    vcs: Box<dyn VersionControl>,
    database: Box<dyn Database>,
    patches: Box<dyn PatchStore>,
    generator: Box<dyn PackageGenerator>,
    events: EventSinkHandle,
    lock_dir: PathBuf,
}

impl HopContext {
    /// Opens the hop repository at `root` with the system git backend and the
    /// configured database.
    ///
    /// Failing to read git or the database yields
    /// [`HopError::EnvironmentUnknown`].
    pub fn open(root: &Path, events: EventSinkHandle) -> HopResult<Self> {
        let project = ProjectConfig::load(root)?;
        let instance = InstanceConfig::load(root, &project)?;

        let unknown = |err: HopError| {
            HopError::EnvironmentUnknown {
                reason: err.to_string(),
            }
        };

        let git = SystemGit::open(root).map_err(unknown)?;
        let lock_dir = git.git_dir().map_err(unknown)?;

        let database_path = instance.database_path(root);
        debug!(database = %database_path.display(), "opening database");
        let database = DieselDatabase::open(&database_path).map_err(unknown)?;

        let patches = FsPatchStore::new(root.join(project.patches_dir()));
        let generator = SnapshotGenerator::new(
            root,
            project.package_dir(),
            project.generator().map(<[String]>::to_vec),
        );

        Ok(Self::from_parts(ContextParts {
            root: root.to_path_buf(),
            project,
            instance,
            vcs: Box::new(git),
            database: Box::new(database),
            patches: Box::new(patches),
            generator: Box::new(generator),
            events,
            lock_dir,
        }))
    }

    pub fn from_parts(parts: ContextParts) -> Self {
        Self {
            root: parts.root,
            project: parts.project,
            instance: parts.instance,
            vcs: parts.vcs,
            database: parts.database,
            patches: parts.patches,
            generator: parts.generator,
            events: parts.events,
            lock_dir: parts.lock_dir,
        }
    }

    /// Finds the hop repository containing `start`.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| ProjectConfig::is_initialized(dir))
            .map(Path::to_path_buf)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    pub fn instance(&self) -> &InstanceConfig {
        &self.instance
    }

    pub fn vcs(&self) -> &dyn VersionControl {
        self.vcs.as_ref()
    }

    pub fn database(&self) -> &dyn Database {
        self.database.as_ref()
    }

    pub fn patches(&self) -> &dyn PatchStore {
        self.patches.as_ref()
    }

    pub fn events(&self) -> &EventSinkHandle {
        &self.events
    }

    pub fn emit(&self, event: HopEvent) {
        self.events.emit(event);
    }

    /// Gathers the raw facts the classifier works from.
    ///
    /// Read failures are recorded rather than returned.
    pub fn observe(&self) -> Observations {
        let mut observations = Observations {
            initialized: true,
            devel: self.project.devel,
            production: self.instance.is_production(),
            ..Default::default()
        };

        let history = self
            .vcs
            .current_branch()
            .and_then(|branch| Ok((branch, committed_releases(self.vcs())?)));
        match history {
            Ok((branch, committed)) => {
                observations.branch = Some(branch);
                observations.last_committed_release = committed.last().cloned();
            }
            Err(err) => observations.git_error = Some(err.to_string()),
        }

        match self.database.last_applied_release() {
            Ok(release) => observations.last_applied_release = release,
            Err(err) => observations.database_error = Some(err.to_string()),
        }

        trace!(?observations, "observed repository");
        observations
    }

    /// Classifies the repository as it is right now.
    pub fn state(&self) -> HopResult<RepositoryState> {
        classify(&self.observe())
    }

    /// Takes the repository lock for the duration of a mutating operation.
    ///
    /// # Errors
    ///
    /// * [`HopError::LockContention`] if another operation holds it.
    pub fn lock(&self) -> HopResult<FileLock> {
        match FileLock::try_acquire(&self.lock_dir, LOCK_NAME)? {
            Some(lock) => {
                trace!(path = %lock.path().display(), "acquired repository lock");
                Ok(lock)
            }
            None => {
                Err(HopError::LockContention {
                    path: self.lock_dir.join(format!("{LOCK_NAME}.lock")),
                })
            }
        }
    }

    /// `path` relative to the repository root, for committing.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    /// Package directory relative to the repository root.
    pub fn package_dir(&self) -> PathBuf {
        self.relative(self.generator.package_dir())
    }

    /// Regenerates the package from the current schema.
    pub fn regenerate_package(&self) -> HopResult<PackageWriteResult> {
        let snapshot = self.database.schema_snapshot()?;
        let result = self.generator.regenerate(&snapshot)?;
        self.emit(HopEvent::PackageRegenerated {
            files: result.files.clone(),
            changed: result.changed,
        });
        Ok(result)
    }
}
