//! Publish pipeline entrypoint used by the CLI.
//!
//! ## Run protocol
//!
//! 1. Enumerate source PDFs (empty → `NoSourcesFound`).
//! 2. Load the template and check every identifier has an entry
//!    (`MissingMetadata`, before any object is written).
//! 3. Check the archive slot for this run's timestamp is free.
//! 4. Per item: read, hash, `ensure_stored`, merge metadata.
//! 5. Build the manifest and compare it with the current stable manifest.
//! 6. Archive, then publish stable (skipped in dry-run).
//!
//! Any failure before step 6 leaves `manifest.json` and `manifests/`
//! untouched. Objects stored in step 4 are harmless: they are new,
//! content-addressed and unreferenced until a manifest points at them.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use pdfshelf_core::{Identifier, Manifest, Template};

use crate::archive::{self, ArchiveStamp};
use crate::cas::{self, StoreResult};
use crate::diff::ChangeSet;
use crate::error::PublishError;
use crate::{hasher, manifest, source};

/// Inputs for one publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub source_dir: PathBuf,
    pub template_path: PathBuf,
    pub site_dir: PathBuf,
    /// Prefix for absolute entry URLs; relative URLs when `None`.
    pub base_url: Option<String>,
    /// Overrides "now" for `generatedAt` and the archive record name.
    pub timestamp: Option<ArchiveStamp>,
    /// Template fields every entry must carry.
    pub required_fields: Vec<String>,
    pub dry_run: bool,
}

impl PublishRequest {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        template_path: impl Into<PathBuf>,
        site_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            template_path: template_path.into(),
            site_dir: site_dir.into(),
            base_url: None,
            timestamp: None,
            required_fields: pdfshelf_core::config::DEFAULT_REQUIRED_FIELDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            dry_run: false,
        }
    }
}

/// Outcome of a publish run.
#[derive(Debug)]
pub struct PublishReport {
    pub manifest: Manifest,
    /// Stable manifest before this run, if one existed and parsed.
    pub previous: Option<Manifest>,
    pub stored: Vec<StoreResult>,
    pub changes: ChangeSet,
    /// Archive record written by this run (`None` in dry-run).
    pub archive_path: Option<PathBuf>,
    /// Template entries with no source PDF.
    pub unused_template_entries: Vec<Identifier>,
    pub dry_run: bool,
}

impl PublishReport {
    pub fn written(&self) -> usize {
        self.stored.iter().filter(|r| r.is_new()).count()
    }

    pub fn existing(&self) -> usize {
        self.stored.len() - self.written()
    }
}

/// Run the publish pipeline.
pub fn run(request: &PublishRequest) -> Result<PublishReport, PublishError> {
    let generated_at = request
        .timestamp
        .map(|s| s.datetime())
        .unwrap_or_else(Utc::now);
    run_at(request, generated_at)
}

/// [`run`] with an explicit generation time.
pub fn run_at(
    request: &PublishRequest,
    generated_at: DateTime<Utc>,
) -> Result<PublishReport, PublishError> {
    let site = request.site_dir.as_path();
    let base_url = request.base_url.as_deref();

    // Step 1: enumerate sources.
    let items = source::enumerate(&request.source_dir)?;
    tracing::info!(
        "found {} source PDF(s) under {}",
        items.len(),
        request.source_dir.display()
    );

    // Step 2: template precondition.
    let template = Template::load(&request.template_path, &request.required_fields)?;
    tracing::debug!(
        "template {} has {} entries",
        request.template_path.display(),
        template.len()
    );
    let missing = template.missing(items.iter().map(|i| &i.identifier));
    if !missing.is_empty() {
        return Err(PublishError::MissingMetadata {
            identifiers: missing,
        });
    }
    let unused: Vec<Identifier> = template
        .unused(items.iter().map(|i| &i.identifier))
        .into_iter()
        .cloned()
        .collect();
    for id in &unused {
        tracing::warn!("template has '{id}' but no source PDF; not publishing it");
    }

    // Step 3: archive slot.
    let stamp = ArchiveStamp::from_datetime(generated_at);
    if !request.dry_run {
        archive::ensure_free(site, &stamp)?;
    }

    // Step 4: store objects, merge metadata.
    let mut stored = Vec::with_capacity(items.len());
    let mut entries = Vec::with_capacity(items.len());
    for item in &items {
        let bytes = read_source(&item.path)?;
        let digest = hasher::digest_bytes(&bytes);
        let result =
            cas::ensure_stored(site, &item.identifier, &bytes, &digest, request.dry_run)?;
        let metadata = template.merge(&item.identifier)?;
        entries.push(manifest::build_entry(result.object(), metadata, base_url));
        stored.push(result);
    }

    // Step 5: build + compare.
    let manifest = manifest::build(entries, stamp.datetime(), base_url)?;
    let previous = match archive::load_stable(site) {
        Ok(previous) => previous,
        Err(e) => {
            tracing::warn!("ignoring unreadable stable manifest: {e}");
            None
        }
    };
    let changes = ChangeSet::between(previous.as_ref(), &manifest);

    // Step 6: archive, then move the stable pointer.
    let archive_path = if request.dry_run {
        tracing::info!("[dry-run] would archive: {}", stamp.file_name());
        None
    } else {
        let path = archive::archive(site, &manifest)?;
        archive::publish_stable(site, &path)?;
        Some(path)
    };

    tracing::info!(
        "{} entries: {} added, {} updated, {} removed, {} unchanged",
        manifest.entries.len(),
        changes.added(),
        changes.updated(),
        changes.removed(),
        changes.unchanged()
    );

    Ok(PublishReport {
        manifest,
        previous,
        stored,
        changes,
        archive_path,
        unused_template_entries: unused,
        dry_run: request.dry_run,
    })
}

fn read_source(path: &Path) -> Result<Vec<u8>, PublishError> {
    std::fs::read(path).map_err(|source| PublishError::UnreadableSource {
        path: path.to_path_buf(),
        source,
    })
}
