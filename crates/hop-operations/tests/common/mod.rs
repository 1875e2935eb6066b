#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use diesel::connection::SimpleConnection;
use hop_config::{InstanceConfig, ProjectConfig};
use hop_core::{
    database::{Database, DieselDatabase, ReleaseStatus},
    fakes::{MemoryVcs, RecordingGenerator},
    patch::{FsPatchStore, PatchStore},
    release::{BumpLevel, ReleaseId},
    vcs::VersionControl,
};
use hop_events::{CollectorSink, EventSinkHandle};
use hop_operations::{apply, prepare, release, stage, ContextParts, HopContext};
use tempfile::TempDir;

pub const MAIN: &str = "hop_main";

/// A scratch repository with an in-memory history, a real SQLite development
/// database and the initial release `0.0.0` committed.
pub struct Harness {
    pub dir: TempDir,
    pub vcs: MemoryVcs,
    pub generator: RecordingGenerator,
    pub events: Arc<CollectorSink>,
    pub database: DieselDatabase,
    pub ctx: HopContext,
}

pub struct Patch<'a> {
    pub name: &'a str,
    pub up: &'a str,
    pub down: Option<&'a str>,
}

pub fn patch<'a>(name: &'a str, up: &'a str, down: &'a str) -> Patch<'a> {
    Patch {
        name,
        up,
        down: Some(down),
    }
}

pub fn irreversible<'a>(name: &'a str, up: &'a str) -> Patch<'a> {
    Patch {
        name,
        up,
        down: None,
    }
}

pub fn id(s: &str) -> ReleaseId {
    s.parse().unwrap()
}

impl Harness {
    pub fn new(devel: bool, production: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let vcs = MemoryVcs::new(MAIN);
        let generator = RecordingGenerator::new("blog");
        let events = Arc::new(CollectorSink::default());
        let database = DieselDatabase::open(dir.path().join("dev.sqlite3")).unwrap();

        let initial = ReleaseId::initial();
        FsPatchStore::new(dir.path().join("Patches"))
            .create_release(&initial, Some("initial release"))
            .unwrap();
        database
            .set_release_status(&initial, ReleaseStatus::Applied)
            .unwrap();
        let sha = vcs.commit("[hop] new package blog", &[]).unwrap();
        vcs.tag(&initial.tag_name(), &sha).unwrap();

        let ctx = build_context(
            dir.path(),
            devel,
            production,
            &vcs,
            &database,
            &generator,
            events.clone(),
        );

        Self {
            dir,
            vcs,
            generator,
            events,
            database,
            ctx,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// A second, empty database bound to the same repository in production.
    pub fn production(&self, name: &str) -> (DieselDatabase, HopContext) {
        let database = DieselDatabase::open(self.root().join(format!("{name}.sqlite3"))).unwrap();
        let ctx = build_context(
            self.root(),
            true,
            true,
            &self.vcs,
            &database,
            &self.generator,
            self.events.clone(),
        );
        (database, ctx)
    }

    /// Writes a script outside the release directories and returns its path.
    pub fn script(&self, file: &str, sql: &str) -> PathBuf {
        let path = self.root().join("scratch").join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, sql).unwrap();
        path
    }

    /// Prepares a release and stages `patches` into it.
    pub fn prepare_with(&self, level: BumpLevel, patches: &[Patch]) -> ReleaseId {
        let report = prepare::prepare(&self.ctx, level, None).unwrap();
        for p in patches {
            let up = self.script(&format!("{}.sql", p.name), p.up);
            let down = p
                .down
                .map(|sql| self.script(&format!("{}.down.sql", p.name), sql));
            stage::stage(&self.ctx, &up, down.as_deref()).unwrap();
        }
        report.release
    }

    /// Runs a full prepare, stage, apply and release cycle.
    pub fn ship(&self, level: BumpLevel, patches: &[Patch]) -> ReleaseId {
        let release = self.prepare_with(level, patches);
        apply::apply(&self.ctx).unwrap();
        release::release(&self.ctx, false).unwrap();
        release
    }
}

pub fn build_context(
    root: &Path,
    devel: bool,
    production: bool,
    vcs: &MemoryVcs,
    database: &DieselDatabase,
    generator: &RecordingGenerator,
    events: EventSinkHandle,
) -> HopContext {
    let project = ProjectConfig::new("blog", devel).unwrap();
    let instance = InstanceConfig {
        database: "dev.sqlite3".into(),
        production: Some(production),
    };
    HopContext::from_parts(ContextParts {
        root: root.to_path_buf(),
        patches: Box::new(FsPatchStore::new(root.join(project.patches_dir()))),
        project,
        instance,
        vcs: Box::new(vcs.clone()),
        database: Box::new(database.clone()),
        generator: Box::new(generator.clone()),
        events,
        lock_dir: root.join("lock"),
    })
}

/// Runs raw SQL outside of hop's bookkeeping.
pub fn execute(database: &DieselDatabase, sql: &str) {
    database.with_conn(|conn| conn.batch_execute(sql)).unwrap();
}

pub fn digest(database: &DieselDatabase) -> String {
    database.schema_snapshot().unwrap().digest
}

pub fn table_names(database: &DieselDatabase) -> Vec<String> {
    database
        .schema_snapshot()
        .unwrap()
        .objects
        .into_iter()
        .filter(|o| o.kind == "table")
        .map(|o| o.name)
        .collect()
}
