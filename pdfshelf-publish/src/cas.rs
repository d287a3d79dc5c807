//! Content-addressed store writer.
//!
//! Objects live at `pdfs/<identifier>/<digest>.pdf` and are written at most
//! once. An object that already exists is size-checked and left alone; this
//! module never overwrites or deletes anything, because archived manifests
//! may still reference any object ever written.

use std::io::ErrorKind;
use std::path::Path;

use pdfshelf_core::{ContentDigest, Identifier, StoredObject};

use crate::atomic::{self, Persisted};
use crate::error::{io_err, PublishError};
use crate::layout;

/// Outcome of storing a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreResult {
    /// Object was new and has been written.
    Written { object: StoredObject },
    /// Object already existed with the expected size; nothing was written.
    Existing { object: StoredObject },
    /// `--dry-run` mode: the object *would* have been written.
    WouldWrite { object: StoredObject },
}

impl StoreResult {
    pub fn object(&self) -> &StoredObject {
        match self {
            StoreResult::Written { object }
            | StoreResult::Existing { object }
            | StoreResult::WouldWrite { object } => object,
        }
    }

    /// `true` unless the object was already in the store.
    pub fn is_new(&self) -> bool {
        !matches!(self, StoreResult::Existing { .. })
    }
}

/// Make sure `bytes` are stored under their content-addressed path.
///
/// `digest` must be the digest of `bytes`; the caller computes it once and
/// also records it in the manifest.
pub fn ensure_stored(
    site: &Path,
    identifier: &Identifier,
    bytes: &[u8],
    digest: &ContentDigest,
    dry_run: bool,
) -> Result<StoreResult, PublishError> {
    let object = StoredObject::new(identifier.clone(), *digest, bytes.len() as u64);
    let path = layout::object_path(site, &object);

    if let Some(found) = existing_size(&path)? {
        check_size(&path, object.size, found)?;
        tracing::debug!("unchanged: {}", object.relative_path);
        return Ok(StoreResult::Existing { object });
    }

    if dry_run {
        tracing::info!("[dry-run] would store: {}", object.relative_path);
        return Ok(StoreResult::WouldWrite { object });
    }

    match atomic::write_new(&path, bytes)? {
        Persisted::Created => {
            tracing::info!("stored: {}", object.relative_path);
            Ok(StoreResult::Written { object })
        }
        // Another writer got there between the existence check and the rename.
        Persisted::AlreadyExists => {
            let found = existing_size(&path)?.unwrap_or_default();
            check_size(&path, object.size, found)?;
            Ok(StoreResult::Existing { object })
        }
    }
}

fn existing_size(path: &Path) -> Result<Option<u64>, PublishError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Err(io_err(
            path,
            std::io::Error::other("object path exists but is not a regular file"),
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

fn check_size(path: &Path, expected: u64, found: u64) -> Result<(), PublishError> {
    if expected == found {
        return Ok(());
    }
    tracing::error!(
        "integrity conflict: {} is {found} bytes, expected {expected}",
        path.display()
    );
    Err(PublishError::IntegrityConflict {
        path: path.to_path_buf(),
        expected,
        found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::digest_bytes;
    use std::fs;
    use tempfile::TempDir;

    fn store(site: &Path, id: &str, bytes: &[u8], dry_run: bool) -> StoreResult {
        let id = Identifier::parse(id).unwrap();
        ensure_stored(site, &id, bytes, &digest_bytes(bytes), dry_run).unwrap()
    }

    #[test]
    fn first_store_returns_written() {
        let site = TempDir::new().unwrap();
        let result = store(site.path(), "JFK", b"%PDF-1.7 one", false);
        assert!(matches!(result, StoreResult::Written { .. }));

        let path = layout::object_path(site.path(), result.object());
        assert_eq!(fs::read(path).unwrap(), b"%PDF-1.7 one");
        assert!(result
            .object()
            .relative_path
            .starts_with("pdfs/JFK/"));
    }

    #[test]
    fn second_store_same_bytes_returns_existing() {
        let site = TempDir::new().unwrap();
        store(site.path(), "JFK", b"same", false);
        let result = store(site.path(), "JFK", b"same", false);
        assert!(matches!(result, StoreResult::Existing { .. }));
        assert!(!result.is_new());
    }

    #[test]
    fn changed_bytes_get_a_new_path_and_keep_the_old_one() {
        let site = TempDir::new().unwrap();
        let first = store(site.path(), "JFK", b"v1", false);
        let second = store(site.path(), "JFK", b"v2", false);
        assert!(matches!(second, StoreResult::Written { .. }));
        assert_ne!(first.object().relative_path, second.object().relative_path);
        assert_eq!(
            fs::read(layout::object_path(site.path(), first.object())).unwrap(),
            b"v1"
        );
    }

    #[test]
    fn dry_run_does_not_write() {
        let site = TempDir::new().unwrap();
        let result = store(site.path(), "JFK", b"content", true);
        assert!(matches!(result, StoreResult::WouldWrite { .. }));
        assert!(!site.path().join("pdfs").exists(), "dry-run must not create files");
    }

    #[test]
    fn size_mismatch_is_integrity_conflict_and_not_overwritten() {
        let site = TempDir::new().unwrap();
        let id = Identifier::parse("JFK").unwrap();
        let bytes = b"real content";
        let digest = digest_bytes(bytes);
        let object = StoredObject::new(id.clone(), digest, bytes.len() as u64);
        let path = layout::object_path(site.path(), &object);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"corrupt").unwrap();

        let err = ensure_stored(site.path(), &id, bytes, &digest, false).unwrap_err();
        match err {
            PublishError::IntegrityConflict {
                expected, found, ..
            } => {
                assert_eq!(expected, bytes.len() as u64);
                assert_eq!(found, 7);
            }
            other => panic!("expected integrity conflict, got {other:?}"),
        }
        assert_eq!(fs::read(&path).unwrap(), b"corrupt");
    }
}
