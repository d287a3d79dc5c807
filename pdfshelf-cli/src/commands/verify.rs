//! `pdfshelf verify` — check every published manifest against the object store.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use pdfshelf_core::Config;
use pdfshelf_publish::{
    verify::{self, ManifestCheck},
    SiteReport,
};

use super::site_dir;

/// Arguments for `pdfshelf verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Site directory to verify.
    #[arg(long)]
    pub site: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl VerifyArgs {
    pub fn run(self, config: &Config) -> Result<()> {
        let site = site_dir(self.site.as_deref(), config)?;
        let report = verify::verify_site(&site)
            .with_context(|| format!("verify failed for '{}'", site.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize verify JSON")?
            );
        } else {
            print_report(&report);
        }

        if !report.is_ok() {
            if report.problem_count() > 0 {
                bail!("{} problem(s) found", report.problem_count());
            }
            bail!("stable manifest does not match any archived manifest");
        }
        Ok(())
    }
}

fn print_report(report: &SiteReport) {
    if report.stable.is_none() && report.archives.is_empty() {
        println!("Nothing published yet.");
        return;
    }

    for check in &report.archives {
        print_check(check);
    }
    if let Some(stable) = &report.stable {
        print_check(stable);
        match &report.stable_source {
            Some(name) => println!("  stable manifest is {name}"),
            None => println!(
                "  {} stable manifest is not a copy of any archived manifest",
                "✗".red()
            ),
        }
    }
}

fn print_check(check: &ManifestCheck) {
    if check.is_ok() {
        println!("{} {} ({} entries)", "✓".green(), check.name, check.entries);
        return;
    }
    println!(
        "{} {} ({} entries, {} problem(s))",
        "✗".red(),
        check.name,
        check.entries,
        check.problems.len()
    );
    for problem in &check.problems {
        println!("    {problem}");
    }
}
