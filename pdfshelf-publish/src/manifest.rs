//! Manifest assembly.

use chrono::{DateTime, SubsecRound, Utc};

use pdfshelf_core::{Manifest, ManifestEntry, Metadata, StoredObject, SCHEMA_VERSION};

use crate::error::PublishError;

/// Trim whitespace and guarantee a trailing `/`.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{url}/")
    }
}

/// Absolute URL for `object` when a base URL is configured, otherwise its
/// site-relative path.
pub fn entry_url(base_url: Option<&str>, object: &StoredObject) -> String {
    match base_url {
        Some(base) => format!("{}{}", normalize_base_url(base), object.relative_path),
        None => object.relative_path.clone(),
    }
}

/// One entry for a stored object and its merged metadata.
pub fn build_entry(
    object: &StoredObject,
    metadata: Metadata,
    base_url: Option<&str>,
) -> ManifestEntry {
    ManifestEntry {
        identifier: object.identifier.clone(),
        digest: object.digest,
        size_bytes: object.size,
        url: entry_url(base_url, object),
        metadata,
    }
}

/// Assemble a manifest.
///
/// Entries are sorted by identifier so unchanged input serializes to the same
/// bytes apart from `generatedAt`. Every input entry is kept; a repeated
/// identifier is an error rather than a silent drop.
pub fn build(
    mut entries: Vec<ManifestEntry>,
    generated_at: DateTime<Utc>,
    base_url: Option<&str>,
) -> Result<Manifest, PublishError> {
    entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    if let Some(pair) = entries
        .windows(2)
        .find(|pair| pair[0].identifier == pair[1].identifier)
    {
        return Err(PublishError::DuplicateEntry {
            identifier: pair[0].identifier.clone(),
        });
    }

    Ok(Manifest {
        schema_version: SCHEMA_VERSION,
        generated_at: generated_at.trunc_subsecs(0),
        base_url: base_url.map(normalize_base_url),
        entries,
    })
}
