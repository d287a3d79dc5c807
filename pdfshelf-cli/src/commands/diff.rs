//! `pdfshelf diff` — unified diff of what publish would change.

use anyhow::{Context, Result};
use clap::Args;

use pdfshelf_core::Config;
use pdfshelf_publish::{diff::manifest_diff, pipeline};

use super::{publish::print_changes, InputArgs};

/// Arguments for `pdfshelf diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

impl DiffArgs {
    pub fn run(self, config: &Config) -> Result<()> {
        let mut request = self.input.request(config)?;
        request.dry_run = true;

        let report = pipeline::run(&request)
            .with_context(|| format!("diff failed for '{}'", request.source_dir.display()))?;
        let diff = manifest_diff(report.previous.as_ref(), &report.manifest)
            .context("failed to render manifest diff")?;

        if diff.is_empty() {
            println!("No differences.");
            return Ok(());
        }

        print!("{diff}");
        if !diff.ends_with('\n') {
            println!();
        }
        print_changes(&report.changes);
        Ok(())
    }
}
