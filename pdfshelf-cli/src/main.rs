//! pdfshelf — content-addressed PDF publishing CLI.
//!
//! # Usage
//!
//! ```text
//! pdfshelf publish --source <dir> --template <path> --site <dir> [--base-url <url>] [--timestamp <stamp>] [--dry-run]
//! pdfshelf diff --source <dir> --template <path> --site <dir>
//! pdfshelf verify --site <dir> [--json]
//! pdfshelf history --site <dir> [--json]
//! pdfshelf rollback --site <dir> <record>
//! ```
//!
//! Every path flag falls back to `pdfshelf.yaml` (or `--config <path>`).

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, history::HistoryArgs, publish::PublishArgs, rollback::RollbackArgs,
    verify::VerifyArgs,
};
use pdfshelf_core::Config;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pdfshelf",
    version,
    about = "Publish PDFs to a content-addressed site with a versioned manifest",
    long_about = None,
)]
struct Cli {
    /// Config file (default: ./pdfshelf.yaml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hash, store and publish every source PDF, then archive the manifest.
    Publish(PublishArgs),

    /// Show what publish would change in the stable manifest.
    Diff(DiffArgs),

    /// Check every published manifest still resolves to intact objects.
    Verify(VerifyArgs),

    /// List archived manifests.
    History(HistoryArgs),

    /// Make an archived manifest the stable manifest again.
    Rollback(RollbackArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().context("could not determine working directory")?;
    let config = Config::discover(cli.config.as_deref(), &cwd).context("failed to load config")?;
    tracing::debug!("config: {config:?}");

    match cli.command {
        Commands::Publish(args) => args.run(&config),
        Commands::Diff(args) => args.run(&config),
        Commands::Verify(args) => args.run(&config),
        Commands::History(args) => args.run(&config),
        Commands::Rollback(args) => args.run(&config),
    }
}

/// Library crates log through `log`; the fmt subscriber picks those records
/// up as well.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
