//! # pdfshelf-publish
//!
//! Content-addressed publishing of PDFs and their manifest.
//!
//! Call [`pipeline::run`] to publish a source directory into a site
//! directory. [`verify::verify_site`] checks every manifest ever published
//! still resolves, and [`archive::rollback`] makes an earlier one stable again.

mod atomic;

pub mod archive;
pub mod cas;
pub mod diff;
pub mod error;
pub mod hasher;
pub mod layout;
pub mod manifest;
pub mod pipeline;
pub mod source;
pub mod verify;

pub use archive::{ArchiveRecord, ArchiveStamp};
pub use cas::StoreResult;
pub use diff::{Change, ChangeSet};
pub use error::PublishError;
pub use pipeline::{PublishReport, PublishRequest};
pub use verify::{Problem, SiteReport};
