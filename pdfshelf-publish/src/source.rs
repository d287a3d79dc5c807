//! Source PDF discovery.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pdfshelf_core::Identifier;

use crate::error::PublishError;

/// One PDF to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub identifier: Identifier,
    pub path: PathBuf,
}

/// Every `*.pdf` under `dir` (recursively), sorted by identifier.
///
/// The identifier is the normalised filename stem. Hidden files (including
/// `._JFK.pdf` resource forks) are skipped and symlinked directories are not
/// followed.
pub fn enumerate(dir: &Path) -> Result<Vec<SourceItem>, PublishError> {
    let mut files = Vec::new();
    collect_pdfs(dir, &mut files)?;
    files.sort();

    let mut by_id: BTreeMap<Identifier, PathBuf> = BTreeMap::new();
    for path in files {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let identifier = Identifier::parse(&stem).map_err(|source| {
            PublishError::InvalidIdentifier {
                path: path.clone(),
                source,
            }
        })?;
        if let Some(first) = by_id.get(&identifier) {
            return Err(PublishError::DuplicateIdentifier {
                identifier,
                first: first.clone(),
                second: path,
            });
        }
        by_id.insert(identifier, path);
    }

    if by_id.is_empty() {
        return Err(PublishError::NoSourcesFound {
            dir: dir.to_path_buf(),
        });
    }

    Ok(by_id
        .into_iter()
        .map(|(identifier, path)| SourceItem { identifier, path })
        .collect())
}

fn collect_pdfs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), PublishError> {
    let unreadable = |source: std::io::Error| PublishError::UnreadableSource {
        path: dir.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(unreadable)?;
        if file_type.is_dir() {
            collect_pdfs(&path, out)?;
        } else if is_pdf(&path) && (file_type.is_file() || path.is_file()) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
