//! Exclusive repository lock.
//!
//! Mutating operations hold an `flock` on `<dir>/<name>.lock` for as long as the
//! returned [`FileLock`] lives. Acquisition never waits: a lock held elsewhere is
//! reported immediately so the caller can fail with a contention error.

use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};

use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg},
};

use crate::error::{LockError, LockResult};

pub struct FileLock {
    _file: Flock<File>,
    path: PathBuf,
}

/// Lock file name for `name`, with anything outside `[A-Za-z0-9._-]` replaced.
fn lock_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.lock")
}

impl FileLock {
    /// Takes the lock named `name` in `dir`, creating both if needed.
    ///
    /// Returns `None` when the lock is already held, by another process or by
    /// another handle in this one. Dropping the lock releases it.
    pub fn try_acquire(dir: &Path, name: &str) -> LockResult<Option<Self>> {
        fs::create_dir_all(dir)?;
        let path = dir.join(lock_file_name(name));
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(file) => {
                Ok(Some(Self {
                    _file: file,
                    path,
                }))
            }
            Err((_, Errno::EWOULDBLOCK)) => Ok(None),
            Err((_, err)) => {
                Err(LockError::AcquireFailed(format!(
                    "{}: {err}",
                    path.display()
                )))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_file_name() {
        assert_eq!(lock_file_name("hop"), "hop.lock");
        assert_eq!(lock_file_name("repo/state"), "repo_state.lock");
    }

    #[test]
    fn test_lock_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let lock = FileLock::try_acquire(&nested, "hop").unwrap().unwrap();
        assert!(nested.is_dir());
        assert_eq!(lock.path(), nested.join("hop.lock"));
    }

    #[test]
    fn test_second_holder_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileLock::try_acquire(dir.path(), "hop").unwrap();
        assert!(first.is_some());

        assert!(FileLock::try_acquire(dir.path(), "hop").unwrap().is_none());

        drop(first);
        assert!(FileLock::try_acquire(dir.path(), "hop").unwrap().is_some());
    }

    #[test]
    fn test_distinct_names_do_not_contend() {
        let dir = tempfile::tempdir().unwrap();
        let _hop = FileLock::try_acquire(dir.path(), "hop").unwrap().unwrap();
        assert!(FileLock::try_acquire(dir.path(), "other").unwrap().is_some());
    }
}
