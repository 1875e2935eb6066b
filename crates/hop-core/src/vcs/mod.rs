//! Version-control adapter.

use std::path::PathBuf;

use crate::{release::ReleaseId, HopResult};

pub mod git;

pub use git::SystemGit;

/// Branch, tag, commit and push primitives over the repository history.
pub trait VersionControl: Send + Sync {
    /// Name of the checked out branch, `HEAD` when detached.
    fn current_branch(&self) -> HopResult<String>;

    fn branch_exists(&self, name: &str) -> HopResult<bool>;

    /// Creates `name` at HEAD and checks it out.
    fn create_branch(&self, name: &str) -> HopResult<()>;

    fn checkout(&self, name: &str) -> HopResult<()>;

    fn delete_branch(&self, name: &str) -> HopResult<()>;

    /// Fast-forwards the current branch to `name`.
    fn merge_fast_forward(&self, name: &str) -> HopResult<()>;

    /// Commits `paths` (relative to the work tree) and returns the new HEAD.
    ///
    /// An empty commit is created when nothing changed.
    fn commit(&self, message: &str, paths: &[PathBuf]) -> HopResult<String>;

    /// Creates an annotated tag on `target`.
    fn tag(&self, name: &str, target: &str) -> HopResult<()>;

    /// All tag names.
    fn tags(&self) -> HopResult<Vec<String>>;

    /// Whether `tag` exists and is an ancestor of HEAD.
    fn history_contains(&self, tag: &str) -> HopResult<bool>;

    fn push(&self, remote: &str, branch: &str, tags: &[String]) -> HopResult<()>;

    fn head(&self) -> HopResult<String>;
}

/// Releases whose tags are reachable from HEAD, ascending.
pub fn committed_releases(vcs: &dyn VersionControl) -> HopResult<Vec<ReleaseId>> {
    let mut releases = Vec::new();
    for tag in vcs.tags()? {
        let Some(id) = ReleaseId::from_tag(&tag) else {
            continue;
        };
        if vcs.history_contains(&tag)? {
            releases.push(id);
        }
    }
    releases.sort();
    releases.dedup();
    Ok(releases)
}

/// Whether `id` has been committed, i.e. its tag exists anywhere in the repository.
pub fn is_tagged(vcs: &dyn VersionControl, id: &ReleaseId) -> HopResult<bool> {
    let tag = id.tag_name();
    Ok(vcs.tags()?.iter().any(|t| *t == tag))
}
