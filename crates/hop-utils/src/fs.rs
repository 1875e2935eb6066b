use std::{fs, path::Path};

use crate::error::{FileSystemError, FileSystemResult};

/// Creates a directory structure if it doesn't exist.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    if path.exists() {
        if !path.is_dir() {
            return Err(FileSystemError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|err| {
        FileSystemError::Directory {
            path: path.to_path_buf(),
            action: "create",
            source: err,
        }
    })
}

/// Reads a UTF-8 file into a string.
pub fn read_file<P: AsRef<Path>>(path: P) -> FileSystemResult<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "read",
            source: err,
        }
    })
}

/// Writes `contents` to `path`, creating parent directories as needed.
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> FileSystemResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    fs::write(path, contents).map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "write",
            source: err,
        }
    })
}

/// Copies `from` to `to`, creating parent directories of `to` as needed.
pub fn copy_file<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> FileSystemResult<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    if let Some(parent) = to.parent() {
        ensure_dir_exists(parent)?;
    }
    fs::copy(from, to).map(|_| ()).map_err(|err| {
        FileSystemError::File {
            path: from.to_path_buf(),
            action: "copy",
            source: err,
        }
    })
}

/// Removes a file or directory. Missing paths are not an error.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(());
    }

    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    result.map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "remove",
            source: err,
        }
    })
}
