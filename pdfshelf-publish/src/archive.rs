//! Manifest archive records and the stable manifest pointer.
//!
//! ## Publish protocol
//!
//! 1. Serialize the manifest once.
//! 2. Write it to `manifests/manifest-<stamp>.json` with a no-clobber rename
//!    and fsync the directory. An existing record is an [`ArchiveCollision`].
//! 3. Read the record back and atomically replace `manifest.json` with those
//!    exact bytes.
//!
//! A crash between 2 and 3 leaves the previous stable manifest in place, and
//! that manifest still resolves because objects are never deleted.
//!
//! [`ArchiveCollision`]: PublishError::ArchiveCollision

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};

use pdfshelf_core::Manifest;

use crate::atomic::{self, Persisted};
use crate::error::{io_err, PublishError};
use crate::layout::{self, ARCHIVE_PREFIX, ARCHIVE_SUFFIX};
use crate::verify;

/// ISO 8601 basic format used in archive file names.
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
/// Older `YYYYMMDD-HHMMSS` form, accepted for `--timestamp`.
const LEGACY_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

// ---------------------------------------------------------------------------
// ArchiveStamp
// ---------------------------------------------------------------------------

/// A whole-second UTC timestamp naming one archive record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveStamp(DateTime<Utc>);

impl ArchiveStamp {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(0))
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// `manifest-20261019T083000Z.json`
    pub fn file_name(&self) -> String {
        format!("{ARCHIVE_PREFIX}{self}{ARCHIVE_SUFFIX}")
    }

    /// Recover the stamp from an archive file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let raw = name
            .strip_prefix(ARCHIVE_PREFIX)?
            .strip_suffix(ARCHIVE_SUFFIX)?;
        NaiveDateTime::parse_from_str(raw, STAMP_FORMAT)
            .ok()
            .map(|naive| Self(Utc.from_utc_datetime(&naive)))
    }
}

impl fmt::Display for ArchiveStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}

impl FromStr for ArchiveStamp {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        [STAMP_FORMAT, LEGACY_STAMP_FORMAT]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| Self(Utc.from_utc_datetime(&naive)))
            .ok_or_else(|| PublishError::InvalidTimestamp { raw: s.to_owned() })
    }
}

// ---------------------------------------------------------------------------
// Archive + publish
// ---------------------------------------------------------------------------

/// Path of the archive record for `stamp`.
pub fn archive_path(site: &Path, stamp: &ArchiveStamp) -> PathBuf {
    layout::archive_dir(site).join(stamp.file_name())
}

/// Fail fast if a record for `stamp` already exists.
pub fn ensure_free(site: &Path, stamp: &ArchiveStamp) -> Result<(), PublishError> {
    let path = archive_path(site, stamp);
    if path.exists() {
        return Err(PublishError::ArchiveCollision { path });
    }
    Ok(())
}

/// Write the immutable archive record for `manifest`.
///
/// The record is named after `manifest.generated_at` and never overwrites an
/// existing one.
pub fn archive(site: &Path, manifest: &Manifest) -> Result<PathBuf, PublishError> {
    let stamp = ArchiveStamp::from_datetime(manifest.generated_at);
    let path = archive_path(site, &stamp);
    let bytes = manifest.to_json_bytes()?;

    match atomic::write_new(&path, &bytes)? {
        Persisted::Created => {
            tracing::info!("archived: {}", path.display());
            Ok(path)
        }
        Persisted::AlreadyExists => Err(PublishError::ArchiveCollision { path }),
    }
}

/// Atomically make the archive record at `record` the stable manifest.
///
/// The stable manifest receives the record's exact bytes.
pub fn publish_stable(site: &Path, record: &Path) -> Result<(), PublishError> {
    let bytes = std::fs::read(record).map_err(|e| io_err(record, e))?;
    // Refuse to point clients at something that is not a manifest.
    Manifest::from_json_slice(&bytes).map_err(|source| PublishError::ManifestParse {
        path: record.to_path_buf(),
        source,
    })?;

    let stable = layout::stable_manifest_path(site);
    atomic::replace(&stable, &bytes)?;
    tracing::info!("published stable: {} → {}", record.display(), stable.display());
    Ok(())
}

/// Parse the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<Manifest, PublishError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    Manifest::from_json_slice(&bytes).map_err(|source| PublishError::ManifestParse {
        path: path.to_path_buf(),
        source,
    })
}

/// The current stable manifest, or `None` before the first publish.
pub fn load_stable(site: &Path) -> Result<Option<Manifest>, PublishError> {
    let path = layout::stable_manifest_path(site);
    match std::fs::metadata(&path) {
        Ok(_) => load_manifest(&path).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(&path, e)),
    }
}

// ---------------------------------------------------------------------------
// History + rollback
// ---------------------------------------------------------------------------

/// One archive record on disk.
#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    pub name: String,
    pub path: PathBuf,
    pub stamp: ArchiveStamp,
    pub manifest: Manifest,
    /// Byte-identical to the current stable manifest.
    pub is_stable: bool,
}

/// All archive records, oldest first.
///
/// Files in `manifests/` that do not follow the record naming scheme are
/// ignored with a warning.
pub fn list_archives(site: &Path) -> Result<Vec<ArchiveRecord>, PublishError> {
    let dir = layout::archive_dir(site);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(io_err(&dir, e)),
    };

    let stable_path = layout::stable_manifest_path(site);
    let stable_bytes = match std::fs::read(&stable_path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(io_err(&stable_path, e)),
    };

    let mut records = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let Some(stamp) = ArchiveStamp::from_file_name(&name) else {
            tracing::warn!("ignoring unexpected file in archive: {name}");
            continue;
        };
        let path = entry.path();
        let bytes = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
        let manifest =
            Manifest::from_json_slice(&bytes).map_err(|source| PublishError::ManifestParse {
                path: path.clone(),
                source,
            })?;
        let is_stable = stable_bytes.as_deref() == Some(bytes.as_slice());
        records.push(ArchiveRecord {
            name,
            path,
            stamp,
            manifest,
            is_stable,
        });
    }
    records.sort_by(|a, b| a.stamp.cmp(&b.stamp));
    Ok(records)
}

/// Resolve a user-supplied record reference: a record file name
/// (`manifest-<stamp>.json`) or a bare stamp.
///
/// Only files inside `manifests/` qualify, so the stable manifest can only
/// ever become a copy of an archive record.
pub fn resolve_record(site: &Path, reference: &str) -> Result<PathBuf, PublishError> {
    let name = match reference.parse::<ArchiveStamp>() {
        Ok(stamp) => stamp.file_name(),
        Err(_) => reference.trim().to_owned(),
    };
    if ArchiveStamp::from_file_name(&name).is_none() {
        return Err(PublishError::ArchiveNotFound {
            path: PathBuf::from(reference),
        });
    }
    let candidate = layout::archive_dir(site).join(name);
    if !candidate.is_file() {
        return Err(PublishError::ArchiveNotFound { path: candidate });
    }
    Ok(candidate)
}

/// Make an earlier archive record the stable manifest again.
///
/// The record must fully verify against the object store first.
pub fn rollback(site: &Path, reference: &str) -> Result<ArchiveRecord, PublishError> {
    let path = resolve_record(site, reference)?;
    let manifest = load_manifest(&path)?;

    let problems = verify::verify_manifest(site, &manifest)?;
    if !problems.is_empty() {
        return Err(PublishError::UnresolvableArchive { path, problems });
    }

    publish_stable(site, &path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = ArchiveStamp::from_file_name(&name)
        .unwrap_or_else(|| ArchiveStamp::from_datetime(manifest.generated_at));
    Ok(ArchiveRecord {
        name,
        path,
        stamp,
        manifest,
        is_stable: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfshelf_core::SCHEMA_VERSION;
    use std::fs;
    use tempfile::TempDir;

    fn manifest_at(secs: i64) -> Manifest {
        Manifest {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc.timestamp_opt(secs, 0).unwrap(),
            base_url: None,
            entries: vec![],
        }
    }

    #[test]
    fn stamp_formats() {
        let stamp: ArchiveStamp = "20261019T083000Z".parse().unwrap();
        assert_eq!(stamp.to_string(), "20261019T083000Z");
        assert_eq!(stamp.file_name(), "manifest-20261019T083000Z.json");

        let legacy: ArchiveStamp = "20261019-083000".parse().unwrap();
        assert_eq!(legacy, stamp);
        assert_eq!(ArchiveStamp::from_file_name(&stamp.file_name()), Some(stamp));

        assert!("2026-10-19".parse::<ArchiveStamp>().is_err());
        assert!(ArchiveStamp::from_file_name("manifest.json").is_none());
    }

    #[test]
    fn archive_then_publish_is_byte_identical() {
        let site = TempDir::new().unwrap();
        let manifest = manifest_at(1_790_000_000);
        let record = archive(site.path(), &manifest).unwrap();
        publish_stable(site.path(), &record).unwrap();

        let stable = fs::read(layout::stable_manifest_path(site.path())).unwrap();
        assert_eq!(stable, fs::read(&record).unwrap());
        assert_eq!(load_stable(site.path()).unwrap(), Some(manifest));
    }

    #[test]
    fn same_timestamp_is_archive_collision() {
        let site = TempDir::new().unwrap();
        let manifest = manifest_at(1_790_000_000);
        let first = archive(site.path(), &manifest).unwrap();
        let before = fs::read(&first).unwrap();

        let mut other = manifest.clone();
        other.base_url = Some("https://changed/".into());
        let err = archive(site.path(), &other).unwrap_err();
        assert!(matches!(err, PublishError::ArchiveCollision { .. }));
        assert_eq!(fs::read(&first).unwrap(), before, "record must not change");

        let stamp = ArchiveStamp::from_datetime(manifest.generated_at);
        assert!(matches!(
            ensure_free(site.path(), &stamp),
            Err(PublishError::ArchiveCollision { .. })
        ));
    }

    #[test]
    fn load_stable_is_none_before_first_publish() {
        let site = TempDir::new().unwrap();
        assert!(load_stable(site.path()).unwrap().is_none());
    }

    #[test]
    fn publish_stable_rejects_non_manifest() {
        let site = TempDir::new().unwrap();
        let bogus = site.path().join("bogus.json");
        fs::write(&bogus, "{}").unwrap();
        let err = publish_stable(site.path(), &bogus).unwrap_err();
        assert!(matches!(err, PublishError::ManifestParse { .. }));
        assert!(!layout::stable_manifest_path(site.path()).exists());
    }

    #[test]
    fn list_archives_sorted_and_marks_stable() {
        let site = TempDir::new().unwrap();
        let newer = archive(site.path(), &manifest_at(1_790_000_100)).unwrap();
        let older = archive(site.path(), &manifest_at(1_790_000_000)).unwrap();
        fs::write(layout::archive_dir(site.path()).join("notes.txt"), "x").unwrap();
        publish_stable(site.path(), &older).unwrap();

        let records = list_archives(site.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, older);
        assert!(records[0].is_stable);
        assert_eq!(records[1].path, newer);
        assert!(!records[1].is_stable);
    }

    #[test]
    fn resolve_record_accepts_name_and_stamp() {
        let site = TempDir::new().unwrap();
        let path = archive(site.path(), &manifest_at(1_790_000_000)).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let stamp = name
            .trim_start_matches(ARCHIVE_PREFIX)
            .trim_end_matches(ARCHIVE_SUFFIX)
            .to_string();

        assert_eq!(resolve_record(site.path(), &name).unwrap(), path);
        assert_eq!(resolve_record(site.path(), &stamp).unwrap(), path);
        assert!(matches!(
            resolve_record(site.path(), "manifest-19990101T000000Z.json"),
            Err(PublishError::ArchiveNotFound { .. })
        ));
    }

    #[test]
    fn resolve_record_rejects_paths_and_foreign_names() {
        let site = TempDir::new().unwrap();
        let record = archive(site.path(), &manifest_at(1_790_000_000)).unwrap();
        let elsewhere = site.path().join("elsewhere.json");
        fs::copy(&record, &elsewhere).unwrap();
        fs::write(layout::archive_dir(site.path()).join("notes.json"), "{}").unwrap();

        for reference in [
            elsewhere.to_string_lossy().into_owned(),
            record.to_string_lossy().into_owned(),
            "../manifest.json".to_string(),
            "notes.json".to_string(),
        ] {
            assert!(
                matches!(
                    resolve_record(site.path(), &reference),
                    Err(PublishError::ArchiveNotFound { .. })
                ),
                "{reference} must not resolve"
            );
        }
    }
}
