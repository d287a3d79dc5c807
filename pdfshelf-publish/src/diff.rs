//! What changed between the previous stable manifest and a new one.

use std::collections::BTreeSet;

use serde::Serialize;
use similar::TextDiff;

use pdfshelf_core::{ContentDigest, Identifier, Manifest};

use crate::error::PublishError;

/// Per-identifier classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    Added { digest: ContentDigest },
    /// New content: new digest, new object path.
    Updated {
        from: ContentDigest,
        to: ContentDigest,
    },
    /// Same object, different metadata or URL.
    MetadataChanged,
    Unchanged,
    /// No longer published. The object stays in the store.
    Removed { digest: ContentDigest },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryChange {
    pub identifier: Identifier,
    #[serde(flatten)]
    pub change: Change,
}

/// Changes for every identifier in either manifest, sorted by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub changes: Vec<EntryChange>,
}

impl ChangeSet {
    /// Compare `next` against `previous` (`None` before the first publish).
    pub fn between(previous: Option<&Manifest>, next: &Manifest) -> Self {
        let prev = previous.map(Manifest::entries_by_id).unwrap_or_default();
        let curr = next.entries_by_id();

        let ids: BTreeSet<&Identifier> = prev.keys().chain(curr.keys()).copied().collect();
        let changes = ids
            .into_iter()
            .map(|id| {
                let change = match (prev.get(id), curr.get(id)) {
                    (None, Some(new)) => Change::Added { digest: new.digest },
                    (Some(old), None) => Change::Removed { digest: old.digest },
                    (Some(old), Some(new)) if old.digest != new.digest => Change::Updated {
                        from: old.digest,
                        to: new.digest,
                    },
                    (Some(old), Some(new)) if old != new => Change::MetadataChanged,
                    _ => Change::Unchanged,
                };
                EntryChange {
                    identifier: id.clone(),
                    change,
                }
            })
            .collect();
        Self { changes }
    }

    fn count(&self, pred: impl Fn(&Change) -> bool) -> usize {
        self.changes.iter().filter(|c| pred(&c.change)).count()
    }

    pub fn added(&self) -> usize {
        self.count(|c| matches!(c, Change::Added { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|c| matches!(c, Change::Updated { .. } | Change::MetadataChanged))
    }

    pub fn removed(&self) -> usize {
        self.count(|c| matches!(c, Change::Removed { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|c| matches!(c, Change::Unchanged))
    }

    /// `true` when the new manifest publishes exactly what the previous one did.
    pub fn is_noop(&self) -> bool {
        self.changes
            .iter()
            .all(|c| matches!(c.change, Change::Unchanged))
    }
}

/// Unified diff of two manifests' JSON.
///
/// `generatedAt` always differs between runs, so the new manifest is rendered
/// with the previous timestamp to keep it out of the diff.
pub fn manifest_diff(previous: Option<&Manifest>, next: &Manifest) -> Result<String, PublishError> {
    let old_text = match previous {
        Some(m) => String::from_utf8_lossy(&m.to_json_bytes()?).into_owned(),
        None => String::new(),
    };
    let mut normalized = next.clone();
    if let Some(prev) = previous {
        normalized.generated_at = prev.generated_at;
    }
    let new_text = String::from_utf8_lossy(&normalized.to_json_bytes()?).into_owned();

    if old_text == new_text {
        return Ok(String::new());
    }
    Ok(TextDiff::from_lines(&old_text, &new_text)
        .unified_diff()
        .header("a/manifest.json", "b/manifest.json")
        .context_radius(3)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pdfshelf_core::{ManifestEntry, Metadata};
    use serde_json::json;

    fn entry(id: &str, byte: u8, name: &str) -> ManifestEntry {
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), json!(name));
        ManifestEntry {
            identifier: Identifier::parse(id).unwrap(),
            digest: ContentDigest::from_bytes([byte; 32]),
            size_bytes: 10,
            url: format!("pdfs/{id}/{}.pdf", hex_of(byte)),
            metadata,
        }
    }

    fn hex_of(byte: u8) -> String {
        ContentDigest::from_bytes([byte; 32]).to_hex()
    }

    fn manifest(secs: i64, entries: Vec<ManifestEntry>) -> Manifest {
        Manifest {
            schema_version: 1,
            generated_at: Utc.timestamp_opt(secs, 0).unwrap(),
            base_url: None,
            entries,
        }
    }

    #[test]
    fn first_publish_is_all_added() {
        let next = manifest(0, vec![entry("JFK", 1, "a"), entry("LAX", 2, "b")]);
        let set = ChangeSet::between(None, &next);
        assert_eq!(set.added(), 2);
        assert!(!set.is_noop());
    }

    #[test]
    fn classifies_each_kind() {
        let prev = manifest(
            0,
            vec![
                entry("JFK", 1, "Kennedy"),
                entry("LAX", 2, "LA"),
                entry("ORD", 3, "O'Hare"),
                entry("SFO", 4, "SF"),
            ],
        );
        let next = manifest(
            60,
            vec![
                entry("BOS", 5, "Logan"),
                entry("JFK", 9, "Kennedy"),
                entry("LAX", 2, "Los Angeles"),
                entry("SFO", 4, "SF"),
            ],
        );
        let set = ChangeSet::between(Some(&prev), &next);
        let kinds: Vec<_> = set
            .changes
            .iter()
            .map(|c| (c.identifier.as_str(), c.change.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("BOS", Change::Added { digest: ContentDigest::from_bytes([5; 32]) }),
                (
                    "JFK",
                    Change::Updated {
                        from: ContentDigest::from_bytes([1; 32]),
                        to: ContentDigest::from_bytes([9; 32]),
                    }
                ),
                ("LAX", Change::MetadataChanged),
                ("ORD", Change::Removed { digest: ContentDigest::from_bytes([3; 32]) }),
                ("SFO", Change::Unchanged),
            ]
        );
        assert_eq!((set.added(), set.updated(), set.removed(), set.unchanged()), (1, 2, 1, 1));
    }

    #[test]
    fn timestamp_only_change_is_noop_with_empty_diff() {
        let prev = manifest(0, vec![entry("JFK", 1, "Kennedy")]);
        let next = manifest(3600, vec![entry("JFK", 1, "Kennedy")]);
        assert!(ChangeSet::between(Some(&prev), &next).is_noop());
        assert_eq!(manifest_diff(Some(&prev), &next).unwrap(), "");
    }

    #[test]
    fn digest_change_shows_in_unified_diff() {
        let prev = manifest(0, vec![entry("JFK", 1, "Kennedy")]);
        let next = manifest(3600, vec![entry("JFK", 2, "Kennedy")]);
        let diff = manifest_diff(Some(&prev), &next).unwrap();
        assert!(diff.contains("--- a/manifest.json"));
        assert!(diff.contains("+++ b/manifest.json"));
        let new_digest = format!("\"digest\": \"{}\"", hex_of(2));
        let old_digest = format!("\"digest\": \"{}\"", hex_of(1));
        assert!(diff.lines().any(|l| l.starts_with('+') && l.contains(&new_digest)));
        assert!(diff.lines().any(|l| l.starts_with('-') && l.contains(&old_digest)));
    }
}
