use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum HashError {
    #[error("Failed to read file `{}`: {source}", path.display())]
    #[diagnostic(
        code(hop_utils::hash::read),
        help("Check that the file exists and is readable")
    )]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Diagnostic, Debug)]
pub enum FileSystemError {
    #[error("Failed to {action} file `{}`: {source}", path.display())]
    #[diagnostic(code(hop_utils::fs::file))]
    File {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to {action} directory `{}`: {source}", path.display())]
    #[diagnostic(code(hop_utils::fs::directory))]
    Directory {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("`{}` is not a directory", path.display())]
    #[diagnostic(code(hop_utils::fs::not_a_directory))]
    NotADirectory { path: PathBuf },
}

#[derive(Error, Diagnostic, Debug)]
pub enum LockError {
    #[error("Failed to acquire lock: {0}")]
    #[diagnostic(
        code(hop_utils::lock::acquire),
        help("Check permissions on the lock directory")
    )]
    AcquireFailed(String),

    #[error("Failed to prepare lock file: {0}")]
    #[diagnostic(code(hop_utils::lock::io))]
    Io(#[from] std::io::Error),
}

#[derive(Error, Diagnostic, Debug)]
pub enum UtilsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lock(#[from] LockError),
}

pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type HashResult<T> = std::result::Result<T, HashError>;
pub type LockResult<T> = std::result::Result<T, LockError>;

pub type UtilsResult<T> = std::result::Result<T, UtilsError>;

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_file_error_display() {
        let error = FileSystemError::File {
            path: PathBuf::from("/tmp/manifest.toml"),
            action: "read",
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(
            error.to_string(),
            "Failed to read file `/tmp/manifest.toml`: missing"
        );
    }

    #[test]
    fn test_utils_error_is_transparent() {
        let error: UtilsError = FileSystemError::NotADirectory {
            path: PathBuf::from("/tmp/file"),
        }
        .into();
        assert_eq!(error.to_string(), "`/tmp/file` is not a directory");
    }
}
