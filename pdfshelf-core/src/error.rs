//! Error types for pdfshelf-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Identifier;

/// A filename stem or template key that cannot be used as an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,

    /// Identifiers become a path component, so only `[A-Z0-9_-]` is allowed.
    #[error("identifier '{raw}' contains '{found}'; only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidChar { raw: String, found: char },
}

/// A hex string that is not a valid SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid content digest '{raw}': expected 64 hex characters")]
pub struct DigestParseError {
    pub raw: String,
}

/// All errors that can arise from loading a metadata template or merging
/// metadata for an identifier.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error, with the template path for context.
    #[error("failed to parse template {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parse error, with the template path for context.
    #[error("failed to parse template {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The template parsed but one of its entries is unusable.
    #[error("invalid template {path}: entry '{entry}': {reason}")]
    Invalid {
        path: PathBuf,
        entry: String,
        reason: String,
    },

    /// No template entry exists for a published identifier.
    #[error("no metadata for '{identifier}' in template")]
    MissingMetadata { identifier: Identifier },
}

/// Errors from loading the optional YAML configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `--config` named a file that does not exist.
    #[error("config file not found at {path}")]
    NotFound { path: PathBuf },

    /// A `~` path was given but `dirs::home_dir()` returned `None`.
    #[error("cannot expand '~' in {path}: home directory is unknown")]
    HomeNotFound { path: PathBuf },
}
