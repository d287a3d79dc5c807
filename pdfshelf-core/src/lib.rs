//! pdfshelf core library — domain types, metadata template, config, errors.
//!
//! - [`types`] — identifiers, digests, stored objects, manifests
//! - [`template`] — validated identifier → metadata lookup
//! - [`config`] — optional `pdfshelf.yaml`
//! - [`error`] — [`TemplateError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod template;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, DigestParseError, IdentifierError, TemplateError};
pub use template::{Template, TemplateFormat};
pub use types::{
    ContentDigest, Identifier, Manifest, ManifestEntry, Metadata, StoredObject, SCHEMA_VERSION,
};
