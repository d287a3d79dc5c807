//! Crash-safe file persistence.
//!
//! Bytes are staged in a temporary file inside the destination directory,
//! flushed to disk, then renamed into place. Readers see either nothing (or
//! the previous file) or the complete new file. A failed rename drops the
//! temporary file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{io_err, PublishError};

/// Outcome of [`write_new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Persisted {
    Created,
    /// Something already occupies the path; it was left untouched.
    AlreadyExists,
}

/// Write `bytes` to `path` only if nothing exists there yet.
pub(crate) fn write_new(path: &Path, bytes: &[u8]) -> Result<Persisted, PublishError> {
    let staged = stage(path, bytes)?;
    match staged.persist_noclobber(path) {
        Ok(_) => {}
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => return Ok(Persisted::AlreadyExists),
        Err(e) => return Err(io_err(path, e.error)),
    }
    sync_parent(path)?;
    Ok(Persisted::Created)
}

/// Atomically replace `path` with `bytes`.
pub(crate) fn replace(path: &Path, bytes: &[u8]) -> Result<(), PublishError> {
    let staged = stage(path, bytes)?;
    staged.persist(path).map_err(|e| io_err(path, e.error))?;
    sync_parent(path)
}

fn stage(path: &Path, bytes: &[u8]) -> Result<NamedTempFile, PublishError> {
    let dir = parent_of(path)?;
    create_dirs(dir)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".pdfshelf-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| io_err(dir, e))?;
    staged.write_all(bytes).map_err(|e| io_err(staged.path(), e))?;
    staged.flush().map_err(|e| io_err(staged.path(), e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| io_err(staged.path(), e))?;
    Ok(staged)
}

fn parent_of(path: &Path) -> Result<&Path, PublishError> {
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Ok(Path::new(".")),
        Some(p) => Ok(p),
        None => Err(io_err(
            path,
            std::io::Error::other("path has no parent directory"),
        )),
    }
}

/// Create `dir` and any missing ancestors, outermost first, and flush each
/// new directory entry into its parent. Returns the directories created.
fn create_dirs(dir: &Path) -> Result<Vec<PathBuf>, PublishError> {
    let mut missing = Vec::new();
    let mut cursor = Some(dir);
    while let Some(d) = cursor {
        if d.as_os_str().is_empty() || d.is_dir() {
            break;
        }
        missing.push(d.to_path_buf());
        cursor = d.parent();
    }
    missing.reverse();

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    for created in &missing {
        sync_parent(created)?;
    }
    Ok(missing)
}

/// Flush the directory entry so a completed rename survives a crash.
#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<(), PublishError> {
    let dir = parent_of(path)?;
    std::fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| io_err(dir, e))
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<(), PublishError> {
    Ok(())
}
