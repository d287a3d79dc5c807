//! Site directory layout.
//!
//! ```text
//! <site>/
//!   manifest.json                         stable manifest (mutable)
//!   manifests/manifest-<stamp>.json       archive records (write-once)
//!   pdfs/<identifier>/<digest>.pdf        content-addressed objects (write-once)
//! ```

use std::path::{Path, PathBuf};

use pdfshelf_core::StoredObject;

pub const STABLE_MANIFEST: &str = "manifest.json";
pub const ARCHIVE_DIR: &str = "manifests";
pub const ARCHIVE_PREFIX: &str = "manifest-";
pub const ARCHIVE_SUFFIX: &str = ".json";

pub fn stable_manifest_path(site: &Path) -> PathBuf {
    site.join(STABLE_MANIFEST)
}

pub fn archive_dir(site: &Path) -> PathBuf {
    site.join(ARCHIVE_DIR)
}

/// Absolute path of a stored object. `relative_path` is always `/`-separated.
pub fn object_path(site: &Path, object: &StoredObject) -> PathBuf {
    object
        .relative_path
        .split('/')
        .fold(site.to_path_buf(), |acc, part| acc.join(part))
}
