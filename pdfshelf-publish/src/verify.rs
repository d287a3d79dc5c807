//! Object-store verification.
//!
//! Recomputes what a client would check after downloading: every object a
//! manifest references must exist, have the recorded size, and hash to the
//! recorded digest. Running this over every archive record checks that any
//! of them is still a valid rollback target.

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use pdfshelf_core::{ContentDigest, Identifier, Manifest, StoredObject};

use crate::archive;
use crate::error::{io_err, PublishError};
use crate::hasher;
use crate::layout;

/// A single way in which a manifest entry fails to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    MissingObject {
        identifier: Identifier,
        path: PathBuf,
    },
    SizeMismatch {
        identifier: Identifier,
        path: PathBuf,
        expected: u64,
        found: u64,
    },
    DigestMismatch {
        identifier: Identifier,
        path: PathBuf,
        expected: ContentDigest,
        found: ContentDigest,
    },
    /// The entry URL does not point at the content-addressed path.
    UrlMismatch {
        identifier: Identifier,
        url: String,
        expected_suffix: String,
    },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::MissingObject { identifier, path } => {
                write!(f, "{identifier}: missing object {}", path.display())
            }
            Problem::SizeMismatch {
                identifier,
                path,
                expected,
                found,
            } => write!(
                f,
                "{identifier}: {} is {found} bytes, manifest says {expected}",
                path.display()
            ),
            Problem::DigestMismatch {
                identifier,
                path,
                expected,
                found,
            } => write!(
                f,
                "{identifier}: {} hashes to {found}, manifest says {expected}",
                path.display()
            ),
            Problem::UrlMismatch {
                identifier,
                url,
                expected_suffix,
            } => write!(f, "{identifier}: url {url} does not end with {expected_suffix}"),
        }
    }
}

/// Size and digest of objects already hashed, keyed by absolute path.
type ObjectCache = HashMap<PathBuf, Option<(u64, ContentDigest)>>;

/// Check every entry of `manifest` against the object store under `site`.
pub fn verify_manifest(site: &Path, manifest: &Manifest) -> Result<Vec<Problem>, PublishError> {
    verify_with_cache(site, manifest, &mut ObjectCache::new())
}

fn verify_with_cache(
    site: &Path,
    manifest: &Manifest,
    cache: &mut ObjectCache,
) -> Result<Vec<Problem>, PublishError> {
    let mut problems = Vec::new();
    for entry in &manifest.entries {
        let object = StoredObject::new(entry.identifier.clone(), entry.digest, entry.size_bytes);
        if !entry.url.ends_with(&object.relative_path) {
            problems.push(Problem::UrlMismatch {
                identifier: entry.identifier.clone(),
                url: entry.url.clone(),
                expected_suffix: object.relative_path.clone(),
            });
        }

        let path = layout::object_path(site, &object);
        let observed = match cache.get(&path) {
            Some(observed) => *observed,
            None => {
                let observed = observe(&path)?;
                cache.insert(path.clone(), observed);
                observed
            }
        };

        match observed {
            None => problems.push(Problem::MissingObject {
                identifier: entry.identifier.clone(),
                path,
            }),
            Some((found, _)) if found != entry.size_bytes => problems.push(Problem::SizeMismatch {
                identifier: entry.identifier.clone(),
                path,
                expected: entry.size_bytes,
                found,
            }),
            Some((_, found)) if found != entry.digest => problems.push(Problem::DigestMismatch {
                identifier: entry.identifier.clone(),
                path,
                expected: entry.digest,
                found,
            }),
            Some(_) => {}
        }
    }
    Ok(problems)
}

fn observe(path: &Path) -> Result<Option<(u64, ContentDigest)>, PublishError> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    let digest = hasher::digest_file(path)?;
    Ok(Some((meta.len(), digest)))
}

// ---------------------------------------------------------------------------
// Whole-site report
// ---------------------------------------------------------------------------

/// Verification result for one manifest document.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestCheck {
    pub name: String,
    pub path: PathBuf,
    pub entries: usize,
    pub problems: Vec<Problem>,
}

impl ManifestCheck {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Verification of the stable manifest and every archive record.
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub stable: Option<ManifestCheck>,
    pub archives: Vec<ManifestCheck>,
    /// Name of the archive record the stable manifest is a copy of.
    pub stable_source: Option<String>,
}

impl SiteReport {
    /// `true` when every manifest resolves and the stable manifest is a copy
    /// of some archive record (or nothing has been published yet).
    pub fn is_ok(&self) -> bool {
        let stable_ok = match &self.stable {
            Some(check) => check.is_ok() && self.stable_source.is_some(),
            None => true,
        };
        stable_ok && self.archives.iter().all(ManifestCheck::is_ok)
    }

    pub fn problem_count(&self) -> usize {
        self.stable.iter().map(|c| c.problems.len()).sum::<usize>()
            + self.archives.iter().map(|c| c.problems.len()).sum::<usize>()
    }
}

/// Verify the stable manifest and all archive records under `site`.
///
/// Objects shared between manifests are hashed once.
pub fn verify_site(site: &Path) -> Result<SiteReport, PublishError> {
    let mut cache = ObjectCache::new();

    let mut archives = Vec::new();
    let mut stable_source = None;
    for record in archive::list_archives(site)? {
        let problems = verify_with_cache(site, &record.manifest, &mut cache)?;
        if record.is_stable {
            stable_source = Some(record.name.clone());
        }
        archives.push(ManifestCheck {
            name: record.name,
            path: record.path,
            entries: record.manifest.entries.len(),
            problems,
        });
    }

    let stable = match archive::load_stable(site)? {
        Some(manifest) => {
            let problems = verify_with_cache(site, &manifest, &mut cache)?;
            Some(ManifestCheck {
                name: layout::STABLE_MANIFEST.to_string(),
                path: layout::stable_manifest_path(site),
                entries: manifest.entries.len(),
                problems,
            })
        }
        None => None,
    };

    if stable.is_some() && stable_source.is_none() {
        tracing::warn!("stable manifest is not a copy of any archive record");
    }

    Ok(SiteReport {
        stable,
        archives,
        stable_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cas, hasher::digest_bytes, manifest};
    use chrono::Utc;
    use pdfshelf_core::Metadata;
    use std::fs;
    use tempfile::TempDir;

    fn published(site: &Path, id: &str, bytes: &[u8]) -> Manifest {
        let id = Identifier::parse(id).unwrap();
        let digest = digest_bytes(bytes);
        let stored = cas::ensure_stored(site, &id, bytes, &digest, false).unwrap();
        let entry = manifest::build_entry(stored.object(), Metadata::new(), None);
        manifest::build(vec![entry], Utc::now(), None).unwrap()
    }

    #[test]
    fn clean_store_has_no_problems() {
        let site = TempDir::new().unwrap();
        let m = published(site.path(), "JFK", b"pdf bytes");
        assert!(verify_manifest(site.path(), &m).unwrap().is_empty());
    }

    #[test]
    fn tampered_object_is_digest_mismatch() {
        let site = TempDir::new().unwrap();
        let m = published(site.path(), "JFK", b"pdf bytes");
        let path = site.path().join(&m.entries[0].url);
        fs::write(&path, b"pdf byteZ").unwrap();

        let problems = verify_manifest(site.path(), &m).unwrap();
        assert!(matches!(problems.as_slice(), [Problem::DigestMismatch { .. }]));
    }

    #[test]
    fn truncated_object_is_size_mismatch_and_missing_is_missing() {
        let site = TempDir::new().unwrap();
        let m = published(site.path(), "JFK", b"pdf bytes");
        let path = site.path().join(&m.entries[0].url);

        fs::write(&path, b"pdf").unwrap();
        let problems = verify_manifest(site.path(), &m).unwrap();
        assert!(matches!(problems.as_slice(), [Problem::SizeMismatch { found: 3, .. }]));

        fs::remove_file(&path).unwrap();
        let problems = verify_manifest(site.path(), &m).unwrap();
        assert!(matches!(problems.as_slice(), [Problem::MissingObject { .. }]));
        assert!(problems[0].to_string().contains("missing object"));
    }

    #[test]
    fn wrong_url_is_reported() {
        let site = TempDir::new().unwrap();
        let mut m = published(site.path(), "JFK", b"pdf bytes");
        m.entries[0].url = "https://x.io/pdfs/JFK/latest.pdf".into();
        let problems = verify_manifest(site.path(), &m).unwrap();
        assert!(matches!(problems.as_slice(), [Problem::UrlMismatch { .. }]));
    }

    #[test]
    fn empty_site_is_ok() {
        let site = TempDir::new().unwrap();
        let report = verify_site(site.path()).unwrap();
        assert!(report.is_ok());
        assert!(report.stable.is_none());
        assert_eq!(report.problem_count(), 0);
    }
}
