//! `pdfshelf rollback <record>` — re-point the stable manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use pdfshelf_core::Config;
use pdfshelf_publish::archive;

use super::site_dir;

/// Arguments for `pdfshelf rollback`.
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Archive record: file name (manifest-<stamp>.json) or bare timestamp.
    pub record: String,

    /// Site directory to roll back.
    #[arg(long)]
    pub site: Option<PathBuf>,
}

impl RollbackArgs {
    pub fn run(self, config: &Config) -> Result<()> {
        let site = site_dir(self.site.as_deref(), config)?;
        let record = archive::rollback(&site, &self.record)
            .with_context(|| format!("rollback to '{}' failed", self.record))?;

        println!(
            "{} manifest.json now matches {} ({} entries)",
            "✓".green(),
            record.name,
            record.manifest.entries.len()
        );
        Ok(())
    }
}
