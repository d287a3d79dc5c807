//! `pdfshelf history` — list archived manifests, oldest first.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pdfshelf_core::Config;
use pdfshelf_publish::{archive, ArchiveRecord};

use super::site_dir;

/// Arguments for `pdfshelf history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Site directory whose archive to list.
    #[arg(long)]
    pub site: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordJson {
    name: String,
    generated_at: String,
    entries: usize,
    stable: bool,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "record")]
    name: String,
    #[tabled(rename = "generated at")]
    generated_at: String,
    #[tabled(rename = "entries")]
    entries: usize,
    #[tabled(rename = "stable")]
    stable: String,
}

impl HistoryArgs {
    pub fn run(self, config: &Config) -> Result<()> {
        let site = site_dir(self.site.as_deref(), config)?;
        let records = archive::list_archives(&site)
            .with_context(|| format!("failed to read archive under '{}'", site.display()))?;

        if self.json {
            let payload: Vec<RecordJson> = records.iter().map(record_json).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload)
                    .context("failed to serialize history JSON")?
            );
            return Ok(());
        }

        if records.is_empty() {
            println!("No archived manifests under '{}'.", site.display());
            return Ok(());
        }

        let rows: Vec<RecordRow> = records
            .iter()
            .map(|r| RecordRow {
                name: r.name.clone(),
                generated_at: generated_at(r),
                entries: r.manifest.entries.len(),
                stable: if r.is_stable {
                    "●".green().to_string()
                } else {
                    String::new()
                },
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");

        if !records.iter().any(|r| r.is_stable) {
            println!(
                "{} manifest.json does not match any archived manifest",
                "!".yellow()
            );
        }
        Ok(())
    }
}

fn generated_at(record: &ArchiveRecord) -> String {
    record
        .manifest
        .generated_at
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn record_json(record: &ArchiveRecord) -> RecordJson {
    RecordJson {
        name: record.name.clone(),
        generated_at: generated_at(record),
        entries: record.manifest.entries.len(),
        stable: record.is_stable,
    }
}
