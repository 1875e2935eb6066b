//! System git backend.
//!
//! Every call spawns `git` with an isolated environment: only PATH and HOME are
//! passed through, and a few `-c` overrides pin the behavior hop relies on.

use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use tracing::{debug, trace};

use super::VersionControl;
use crate::{
    error::{ErrorContext, HopError},
    HopResult,
};

const FALLBACK_NAME: &str = "hop";
const FALLBACK_EMAIL: &str = "hop@localhost";

pub struct SystemGit {
    work_tree: PathBuf,
    /// Commit as `hop <hop@localhost>` when no identity is configured.
    fallback_identity: bool,
}

impl SystemGit {
    /// Opens the repository containing `path`.
    pub fn open(path: &Path) -> HopResult<Self> {
        let bare = Self {
            work_tree: path.to_path_buf(),
            fallback_identity: false,
        };
        let top = bare.run(&["rev-parse", "--show-toplevel"])?;

        let mut git = Self {
            work_tree: PathBuf::from(top),
            fallback_identity: false,
        };
        git.fallback_identity = git.run(&["config", "user.email"]).is_err();
        if git.fallback_identity {
            debug!("no git identity configured, committing as {FALLBACK_NAME}");
        }
        Ok(git)
    }

    /// Creates a repository in `path` whose first branch is `initial_branch`.
    pub fn init(path: &Path, initial_branch: &str) -> HopResult<Self> {
        let bare = Self {
            work_tree: path.to_path_buf(),
            fallback_identity: false,
        };
        let initial_branch = format!("--initial-branch={initial_branch}");
        bare.run(&["init", "--quiet", initial_branch.as_str()])?;
        Self::open(path)
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// Absolute path of the `.git` directory.
    pub fn git_dir(&self) -> HopResult<PathBuf> {
        self.run(&["rev-parse", "--absolute-git-dir"])
            .map(PathBuf::from)
    }

    /// Create a git command with isolated environment.
    fn git_cmd(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.work_tree);

        cmd.env_clear();
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }
        if let Ok(home) = std::env::var("HOME") {
            cmd.env("HOME", home);
        }

        cmd.arg("-c").arg("advice.detachedHead=false");
        cmd.arg("-c").arg("core.quotePath=false");
        if self.fallback_identity {
            cmd.arg("-c").arg(format!("user.name={FALLBACK_NAME}"));
            cmd.arg("-c").arg(format!("user.email={FALLBACK_EMAIL}"));
        }

        cmd
    }

    fn output<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> HopResult<Output> {
        let command = describe(args);
        trace!(command = %command, "running git");
        self.git_cmd()
            .args(args)
            .output()
            .with_context(|| format!("running git {command}"))
    }

    /// Runs git and returns its trimmed stdout.
    fn run<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> HopResult<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(HopError::Git {
                command: describe(args),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn describe<S: AsRef<std::ffi::OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

impl VersionControl for SystemGit {
    fn current_branch(&self) -> HopResult<String> {
        // symbolic-ref also works before the first commit
        match self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"]) {
            Ok(branch) => Ok(branch),
            Err(HopError::Git { .. }) => Ok("HEAD".to_string()),
            Err(err) => Err(err),
        }
    }

    fn branch_exists(&self, name: &str) -> HopResult<bool> {
        let reference = format!("refs/heads/{name}");
        let output = self.output(&["rev-parse", "--verify", "--quiet", reference.as_str()])?;
        Ok(output.status.success())
    }

    fn create_branch(&self, name: &str) -> HopResult<()> {
        self.run(&["checkout", "--quiet", "-b", name]).map(|_| ())
    }

    fn checkout(&self, name: &str) -> HopResult<()> {
        self.run(&["checkout", "--quiet", name]).map(|_| ())
    }

    fn delete_branch(&self, name: &str) -> HopResult<()> {
        self.run(&["branch", "--quiet", "-D", name]).map(|_| ())
    }

    fn merge_fast_forward(&self, name: &str) -> HopResult<()> {
        self.run(&["merge", "--quiet", "--ff-only", name])
            .map(|_| ())
    }

    fn commit(&self, message: &str, paths: &[PathBuf]) -> HopResult<String> {
        let existing: Vec<&PathBuf> = paths
            .iter()
            .filter(|p| self.work_tree.join(p).exists())
            .collect();

        if !existing.is_empty() {
            let mut args: Vec<&std::ffi::OsStr> = vec!["add".as_ref(), "-A".as_ref(), "--".as_ref()];
            args.extend(existing.iter().map(|p| p.as_os_str()));
            self.run(&args)?;
        }

        self.run(&["commit", "--quiet", "--allow-empty", "-m", message])?;
        self.head()
    }

    fn tag(&self, name: &str, target: &str) -> HopResult<()> {
        self.run(&["tag", "-a", name, "-m", name, target]).map(|_| ())
    }

    fn tags(&self) -> HopResult<Vec<String>> {
        Ok(self
            .run(&["tag", "--list"])?
            .lines()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn history_contains(&self, tag: &str) -> HopResult<bool> {
        let reference = format!("refs/tags/{tag}");
        let exists = self
            .output(&["rev-parse", "--verify", "--quiet", reference.as_str()])?
            .status
            .success();
        if !exists {
            return Ok(false);
        }

        let output = self.output(&["merge-base", "--is-ancestor", tag, "HEAD"])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => {
                Err(HopError::Git {
                    command: format!("merge-base --is-ancestor {tag} HEAD"),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
        }
    }

    fn push(&self, remote: &str, branch: &str, tags: &[String]) -> HopResult<()> {
        let mut refs = vec![format!("refs/heads/{branch}")];
        refs.extend(tags.iter().map(|t| format!("refs/tags/{t}")));

        let mut args = vec!["push".to_string(), "--quiet".to_string(), remote.to_string()];
        args.extend(refs);
        self.run(&args).map(|_| ())
    }

    fn head(&self) -> HopResult<String> {
        self.run(&["rev-parse", "HEAD"])
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn repo() -> (tempfile::TempDir, SystemGit) {
        let dir = tempfile::tempdir().unwrap();
        let git = SystemGit::init(dir.path(), "hop_main").unwrap();
        git.run(&["config", "user.name", "Test User"]).unwrap();
        git.run(&["config", "user.email", "test@example.com"]).unwrap();
        fs::write(dir.path().join("README"), "hop\n").unwrap();
        git.commit("initial", &[PathBuf::from("README")]).unwrap();
        (dir, git)
    }

    #[test]
    fn test_init_sets_initial_branch() {
        let (_dir, git) = repo();
        assert_eq!(git.current_branch().unwrap(), "hop_main");
        assert_eq!(git.head().unwrap().len(), 40);
    }

    #[test]
    fn test_branch_lifecycle() {
        let (_dir, git) = repo();
        git.create_branch("hop_0.0.1").unwrap();
        assert_eq!(git.current_branch().unwrap(), "hop_0.0.1");
        assert!(git.branch_exists("hop_0.0.1").unwrap());

        git.checkout("hop_main").unwrap();
        git.delete_branch("hop_0.0.1").unwrap();
        assert!(!git.branch_exists("hop_0.0.1").unwrap());
    }

    #[test]
    fn test_fast_forward_and_tags() {
        let (dir, git) = repo();
        git.create_branch("hop_0.0.1").unwrap();
        fs::write(dir.path().join("patch.sql"), "CREATE TABLE t (a);").unwrap();
        let sha = git
            .commit("release 0.0.1", &[PathBuf::from("patch.sql")])
            .unwrap();

        git.checkout("hop_main").unwrap();
        assert!(!git.history_contains("v0.0.1").unwrap());

        git.merge_fast_forward("hop_0.0.1").unwrap();
        assert_eq!(git.head().unwrap(), sha);

        git.tag("v0.0.1", &sha).unwrap();
        assert_eq!(git.tags().unwrap(), vec!["v0.0.1"]);
        assert!(git.history_contains("v0.0.1").unwrap());
    }

    #[test]
    fn test_tag_on_other_branch_is_not_in_history() {
        let (_dir, git) = repo();
        git.create_branch("side").unwrap();
        let sha = git.commit("side work", &[]).unwrap();
        git.tag("v9.9.9", &sha).unwrap();

        git.checkout("hop_main").unwrap();
        assert!(!git.history_contains("v9.9.9").unwrap());
    }

    #[test]
    fn test_push_without_remote_fails() {
        let (_dir, git) = repo();
        let err = git.push("origin", "hop_main", &[]).unwrap_err();
        assert!(matches!(err, HopError::Git { .. }));
    }

    #[test]
    fn test_open_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SystemGit::open(dir.path()),
            Err(HopError::Git { .. })
        ));
    }
}
