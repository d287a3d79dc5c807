pub mod diff;
pub mod history;
pub mod publish;
pub mod rollback;
pub mod verify;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use pdfshelf_core::{config::expand_home, Config, ContentDigest};
use pdfshelf_publish::{ArchiveStamp, PublishRequest};

/// Inputs shared by `publish` and `diff`. Each falls back to the config file.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Directory scanned recursively for `*.pdf`.
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Metadata template (JSON, or YAML by extension).
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Site directory holding `manifest.json`, `manifests/` and `pdfs/`.
    #[arg(long)]
    pub site: Option<PathBuf>,

    /// Prefix for absolute entry URLs.
    #[arg(long)]
    pub base_url: Option<String>,

    /// UTC timestamp for this run: YYYYMMDDTHHMMSSZ or YYYYMMDD-HHMMSS.
    #[arg(long)]
    pub timestamp: Option<String>,
}

impl InputArgs {
    pub fn request(&self, config: &Config) -> Result<PublishRequest> {
        let source = pick(self.source.as_deref(), config.source_dir.as_deref())?
            .context("provide --source or set source_dir in the config file")?;
        let template = pick(self.template.as_deref(), config.template.as_deref())?
            .context("provide --template or set template in the config file")?;
        let site = site_dir(self.site.as_deref(), config)?;

        let mut request = PublishRequest::new(source, template, site);
        request.base_url = self.base_url.clone().or_else(|| config.base_url.clone());
        request.required_fields = config.required_fields();
        if let Some(raw) = &self.timestamp {
            let stamp: ArchiveStamp = raw
                .parse()
                .with_context(|| format!("invalid --timestamp '{raw}'"))?;
            request.timestamp = Some(stamp);
        }
        Ok(request)
    }
}

/// `--site`, else `site_dir` from the config file.
pub fn site_dir(flag: Option<&Path>, config: &Config) -> Result<PathBuf> {
    pick(flag, config.site_dir.as_deref())?
        .context("provide --site or set site_dir in the config file")
}

fn pick(flag: Option<&Path>, configured: Option<&Path>) -> Result<Option<PathBuf>> {
    match flag {
        Some(path) => Ok(Some(expand_home(path)?)),
        None => Ok(configured.map(Path::to_path_buf)),
    }
}

/// First 12 hex digits, enough to tell revisions apart at a glance.
pub fn short_digest(digest: &ContentDigest) -> String {
    digest.to_hex()[..12].to_string()
}
