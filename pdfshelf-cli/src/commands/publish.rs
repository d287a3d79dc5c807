//! `pdfshelf publish` — store source PDFs and publish a new manifest.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use pdfshelf_core::Config;
use pdfshelf_publish::{
    diff::{Change, ChangeSet},
    pipeline, PublishReport,
};

use super::{short_digest, InputArgs};

/// Arguments for `pdfshelf publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Show what would be written without touching the site directory.
    #[arg(long)]
    pub dry_run: bool,
}

impl PublishArgs {
    pub fn run(self, config: &Config) -> Result<()> {
        let mut request = self.input.request(config)?;
        request.dry_run = self.dry_run;

        let report = pipeline::run(&request)
            .with_context(|| format!("publish failed for '{}'", request.source_dir.display()))?;
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &PublishReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let changes = &report.changes;
    println!(
        "{prefix}{} {} entries ({} added, {} updated, {} removed, {} unchanged)",
        "✓".green(),
        report.manifest.entries.len(),
        changes.added(),
        changes.updated(),
        changes.removed(),
        changes.unchanged(),
    );
    println!(
        "{prefix}  objects: {} new, {} already stored",
        report.written(),
        report.existing()
    );
    print_changes(changes);

    for id in &report.unused_template_entries {
        println!("  {} template entry '{id}' has no PDF", "!".yellow());
    }
    match &report.archive_path {
        Some(path) => println!("  archived as {}", path.display()),
        None if report.dry_run => println!("{prefix}  nothing written"),
        None => {}
    }
}

/// One line per entry that is not unchanged.
pub fn print_changes(changes: &ChangeSet) {
    for entry in &changes.changes {
        let id = entry.identifier.as_str();
        match &entry.change {
            Change::Added { digest } => {
                println!("  {}  {id} {}", "+".green(), short_digest(digest).dimmed())
            }
            Change::Updated { from, to } => println!(
                "  {}  {id} {} → {}",
                "~".yellow(),
                short_digest(from).dimmed(),
                short_digest(to)
            ),
            Change::MetadataChanged => println!("  {}  {id} metadata", "~".yellow()),
            Change::Removed { digest } => {
                println!("  {}  {id} {}", "-".red(), short_digest(digest).dimmed())
            }
            Change::Unchanged => {}
        }
    }
}
