//! Writing patched output to disk.

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("output path has no parent directory: {0}")]
    NoParent(PathBuf),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Atomic file write: tempfile + fsync + rename, then bump the mtime.
///
/// Either the full content lands at `path` or the previous file is left
/// untouched.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(OutputError::NoParent(path.to_path_buf())),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    filetime::set_file_mtime(path, filetime::FileTime::now()).map_err(io_err)?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote output");
    Ok(())
}
