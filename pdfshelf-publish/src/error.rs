//! Error types for pdfshelf-publish.

use std::path::PathBuf;

use thiserror::Error;

use pdfshelf_core::{Identifier, IdentifierError, TemplateError};

use crate::verify::Problem;

/// All errors that can arise from a publish run or from archive maintenance.
///
/// Every variant is fatal: the run stops and the stable manifest is left as
/// it was.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A source directory or PDF could not be read.
    #[error("unreadable source {path}: {source}")]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source directory holds no PDFs.
    #[error("no PDFs found under {dir}; refusing to publish an empty manifest")]
    NoSourcesFound { dir: PathBuf },

    /// A PDF's filename stem is not a usable identifier.
    #[error("invalid identifier for {path}: {source}")]
    InvalidIdentifier {
        path: PathBuf,
        #[source]
        source: IdentifierError,
    },

    /// Two source files normalise to the same identifier.
    #[error("duplicate identifier '{identifier}': {first} and {second}")]
    DuplicateIdentifier {
        identifier: Identifier,
        first: PathBuf,
        second: PathBuf,
    },

    /// Two manifest entries share an identifier.
    #[error("duplicate manifest entry for '{identifier}'")]
    DuplicateEntry { identifier: Identifier },

    /// Source PDFs with no template entry.
    #[error("missing metadata for {}; add them to the template", join_ids(.identifiers))]
    MissingMetadata { identifiers: Vec<Identifier> },

    /// An object already stored at a digest path has a different size.
    #[error("integrity conflict at {path}: stored object is {found} bytes, expected {expected}")]
    IntegrityConflict {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    /// An archive record already exists for this timestamp.
    #[error("archive record {path} already exists; retry with a later timestamp")]
    ArchiveCollision { path: PathBuf },

    #[error("archive record not found: {path}")]
    ArchiveNotFound { path: PathBuf },

    /// Rollback target references objects that do not verify.
    #[error("archive record {path} does not resolve ({} problem(s)): {}", .problems.len(), join_problems(.problems))]
    UnresolvableArchive {
        path: PathBuf,
        problems: Vec<Problem>,
    },

    #[error("invalid timestamp '{raw}': expected YYYYMMDDTHHMMSSZ or YYYYMMDD-HHMMSS (UTC)")]
    InvalidTimestamp { raw: String },

    /// An error from loading the template or merging metadata.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// A manifest on disk could not be parsed.
    #[error("failed to parse manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest serialization error.
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`PublishError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}

fn join_ids(ids: &[Identifier]) -> String {
    ids.iter()
        .map(Identifier::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_problems(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
