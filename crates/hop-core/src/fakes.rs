//! In-memory collaborators for engine tests.
//!
//! Both fakes are cheap handles over shared state, so a test can keep a clone
//! for assertions after boxing the other one into the engine.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    constants::PACKAGE_SQL_FILE,
    database::SchemaSnapshot,
    error::HopError,
    package::{PackageGenerator, PackageWriteResult},
    vcs::VersionControl,
    HopResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub sha: String,
    pub message: String,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPush {
    pub remote: String,
    pub branch: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Default)]
struct VcsState {
    /// Each branch as its full list of commit shas, oldest first.
    branches: BTreeMap<String, Vec<String>>,
    current: String,
    tags: BTreeMap<String, String>,
    commits: Vec<RecordedCommit>,
    pushes: Vec<RecordedPush>,
    fail_push: bool,
}

impl VcsState {
    fn current_history(&self) -> HopResult<&Vec<String>> {
        self.branches
            .get(&self.current)
            .ok_or_else(|| git_error("rev-parse HEAD", "no current branch"))
    }
}

fn git_error(command: &str, stderr: &str) -> HopError {
    HopError::Git {
        command: command.to_string(),
        stderr: stderr.to_string(),
    }
}

/// Branches, commits and tags kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryVcs {
    state: Arc<Mutex<VcsState>>,
}

impl MemoryVcs {
    /// A repository with one root commit on `main_branch`.
    pub fn new(main_branch: &str) -> Self {
        let mut state = VcsState {
            current: main_branch.to_string(),
            ..Default::default()
        };
        state
            .branches
            .insert(main_branch.to_string(), vec!["c0".to_string()]);
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, VcsState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes every following push fail.
    pub fn set_fail_push(&self, fail: bool) {
        self.state().fail_push = fail;
    }

    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.state().commits.clone()
    }

    pub fn pushes(&self) -> Vec<RecordedPush> {
        self.state().pushes.clone()
    }

    pub fn branches(&self) -> Vec<String> {
        self.state().branches.keys().cloned().collect()
    }

    /// Tags `name` on the current HEAD without going through a release.
    pub fn force_tag(&self, name: &str) {
        let mut state = self.state();
        if let Some(head) = state
            .branches
            .get(&state.current)
            .and_then(|h| h.last())
            .cloned()
        {
            state.tags.insert(name.to_string(), head);
        }
    }
}

impl VersionControl for MemoryVcs {
    fn current_branch(&self) -> HopResult<String> {
        Ok(self.state().current.clone())
    }

    fn branch_exists(&self, name: &str) -> HopResult<bool> {
        Ok(self.state().branches.contains_key(name))
    }

    fn create_branch(&self, name: &str) -> HopResult<()> {
        let mut state = self.state();
        if state.branches.contains_key(name) {
            return Err(git_error(
                &format!("checkout -b {name}"),
                &format!("a branch named '{name}' already exists"),
            ));
        }
        let history = state.current_history()?.clone();
        state.branches.insert(name.to_string(), history);
        state.current = name.to_string();
        Ok(())
    }

    fn checkout(&self, name: &str) -> HopResult<()> {
        let mut state = self.state();
        if !state.branches.contains_key(name) {
            return Err(git_error(
                &format!("checkout {name}"),
                &format!("pathspec '{name}' did not match"),
            ));
        }
        state.current = name.to_string();
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> HopResult<()> {
        let mut state = self.state();
        if state.current == name {
            return Err(git_error(
                &format!("branch -D {name}"),
                &format!("cannot delete branch '{name}' checked out"),
            ));
        }
        if state.branches.remove(name).is_none() {
            return Err(git_error(
                &format!("branch -D {name}"),
                &format!("branch '{name}' not found"),
            ));
        }
        Ok(())
    }

    fn merge_fast_forward(&self, name: &str) -> HopResult<()> {
        let mut state = self.state();
        let command = format!("merge --ff-only {name}");
        let theirs = state
            .branches
            .get(name)
            .cloned()
            .ok_or_else(|| git_error(&command, "not something we can merge"))?;
        let ours = state.current_history()?;
        if !theirs.starts_with(ours) {
            return Err(git_error(&command, "Not possible to fast-forward, aborting."));
        }
        let current = state.current.clone();
        state.branches.insert(current, theirs);
        Ok(())
    }

    fn commit(&self, message: &str, paths: &[PathBuf]) -> HopResult<String> {
        let mut state = self.state();
        let sha = format!("c{}", state.commits.len() + 1);
        let current = state.current.clone();
        state
            .branches
            .get_mut(&current)
            .ok_or_else(|| git_error("commit", "no current branch"))?
            .push(sha.clone());
        state.commits.push(RecordedCommit {
            sha: sha.clone(),
            message: message.to_string(),
            paths: paths.to_vec(),
        });
        Ok(sha)
    }

    fn tag(&self, name: &str, target: &str) -> HopResult<()> {
        let mut state = self.state();
        if state.tags.contains_key(name) {
            return Err(git_error(
                &format!("tag {name}"),
                &format!("tag '{name}' already exists"),
            ));
        }
        state.tags.insert(name.to_string(), target.to_string());
        Ok(())
    }

    fn tags(&self) -> HopResult<Vec<String>> {
        Ok(self.state().tags.keys().cloned().collect())
    }

    fn history_contains(&self, tag: &str) -> HopResult<bool> {
        let state = self.state();
        let Some(sha) = state.tags.get(tag) else {
            return Ok(false);
        };
        Ok(state.current_history()?.contains(sha))
    }

    fn push(&self, remote: &str, branch: &str, tags: &[String]) -> HopResult<()> {
        let mut state = self.state();
        if state.fail_push {
            return Err(git_error(
                &format!("push {remote}"),
                "could not read from remote repository",
            ));
        }
        state.pushes.push(RecordedPush {
            remote: remote.to_string(),
            branch: branch.to_string(),
            tags: tags.to_vec(),
        });
        Ok(())
    }

    fn head(&self) -> HopResult<String> {
        let state = self.state();
        state
            .current_history()?
            .last()
            .cloned()
            .ok_or_else(|| git_error("rev-parse HEAD", "empty history"))
    }
}

#[derive(Debug, Default)]
struct GeneratorState {
    snapshots: Vec<SchemaSnapshot>,
    fail: bool,
}

/// Records every snapshot it is asked to render.
#[derive(Debug, Clone)]
pub struct RecordingGenerator {
    package_dir: PathBuf,
    state: Arc<Mutex<GeneratorState>>,
}

impl RecordingGenerator {
    pub fn new(package_dir: impl Into<PathBuf>) -> Self {
        Self {
            package_dir: package_dir.into(),
            state: Arc::new(Mutex::new(GeneratorState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, GeneratorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes every following regeneration fail.
    pub fn set_fail(&self, fail: bool) {
        self.state().fail = fail;
    }

    pub fn snapshots(&self) -> Vec<SchemaSnapshot> {
        self.state().snapshots.clone()
    }

    pub fn last(&self) -> Option<SchemaSnapshot> {
        self.state().snapshots.last().cloned()
    }
}

impl PackageGenerator for RecordingGenerator {
    fn regenerate(&self, snapshot: &SchemaSnapshot) -> HopResult<PackageWriteResult> {
        let mut state = self.state();
        if state.fail {
            return Err(HopError::Generator("generator disabled".into()));
        }
        let changed = state
            .snapshots
            .last()
            .map_or(true, |last| last.digest != snapshot.digest);
        state.snapshots.push(snapshot.clone());
        Ok(PackageWriteResult {
            files: vec![self.package_dir.join(PACKAGE_SQL_FILE)],
            changed,
        })
    }

    fn package_dir(&self) -> &Path {
        &self.package_dir
    }
}
