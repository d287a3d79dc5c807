//! Metadata template: identifier → display fields.
//!
//! Two document shapes are accepted, in JSON or YAML:
//!
//! ```text
//! # keyed
//! { "JFK": { "name": "John F. Kennedy Intl", "city": "New York" } }
//!
//! # listed (a previous manifest reused as a template)
//! { "airports": [ { "iata": "JFK", "name": "...", "pdf": { ... } } ] }
//! ```
//!
//! Every entry is validated when the template is loaded, so a run never
//! discovers a broken entry half-way through publishing.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::TemplateError;
use crate::types::{Identifier, Metadata, RESERVED_FIELDS};

/// Keys naming the identifier inside a listed entry.
const LISTED_ID_KEYS: [&str; 2] = ["identifier", "iata"];

/// Keys dropped from listed entries besides [`RESERVED_FIELDS`]: the legacy
/// identifier key and stale publish info carried over from an old manifest.
const LISTED_DROPPED_KEYS: [&str; 2] = ["iata", "pdf"];

/// On-disk encoding of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

impl TemplateFormat {
    /// `.yaml` / `.yml` → YAML, anything else → JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => TemplateFormat::Yaml,
            _ => TemplateFormat::Json,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TemplateDocument {
    Listed(ListedDocument),
    Keyed(BTreeMap<String, Value>),
}

#[derive(Debug, Deserialize)]
struct ListedDocument {
    #[serde(alias = "entries")]
    airports: Vec<Value>,
}

/// A validated metadata template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    entries: BTreeMap<Identifier, Metadata>,
}

impl Template {
    /// Load and validate the template at `path`.
    ///
    /// Each entry must be an object, must not set a reserved key, and must
    /// carry a non-empty value for every name in `required_fields`.
    pub fn load(path: &Path, required_fields: &[String]) -> Result<Self, TemplateError> {
        let contents = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, TemplateFormat::from_path(path), path, required_fields)
    }

    /// Parse template text. `origin` is only used in error messages.
    pub fn parse(
        contents: &str,
        format: TemplateFormat,
        origin: &Path,
        required_fields: &[String],
    ) -> Result<Self, TemplateError> {
        let document: TemplateDocument = match format {
            TemplateFormat::Json => {
                serde_json::from_str(contents).map_err(|source| TemplateError::ParseJson {
                    path: origin.to_path_buf(),
                    source,
                })?
            }
            TemplateFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(|source| TemplateError::ParseYaml {
                    path: origin.to_path_buf(),
                    source,
                })?
            }
        };

        let invalid = |entry: &str, reason: String| TemplateError::Invalid {
            path: origin.to_path_buf(),
            entry: entry.to_owned(),
            reason,
        };

        let raw_entries: Vec<(String, Value)> = match document {
            TemplateDocument::Keyed(map) => map.into_iter().collect(),
            TemplateDocument::Listed(listed) => {
                let mut out = Vec::with_capacity(listed.airports.len());
                for (index, item) in listed.airports.into_iter().enumerate() {
                    let Value::Object(mut fields) = item else {
                        return Err(invalid(&format!("#{index}"), "entry is not an object".into()));
                    };
                    let key = LISTED_ID_KEYS
                        .iter()
                        .find_map(|k| fields.get(*k).and_then(Value::as_str))
                        .map(str::to_owned)
                        .ok_or_else(|| {
                            invalid(&format!("#{index}"), "entry has no 'iata' or 'identifier'".into())
                        })?;
                    // A published manifest is a valid listed template; its
                    // computed fields are recomputed on the next run.
                    for dropped in LISTED_DROPPED_KEYS.iter().chain(RESERVED_FIELDS.iter()) {
                        fields.remove(*dropped);
                    }
                    out.push((key, Value::Object(fields)));
                }
                out
            }
        };

        let mut entries = BTreeMap::new();
        for (key, value) in raw_entries {
            let identifier =
                Identifier::parse(&key).map_err(|e| invalid(&key, e.to_string()))?;
            let Value::Object(fields) = value else {
                return Err(invalid(&key, "entry is not an object".into()));
            };
            if let Some(reserved) = RESERVED_FIELDS.iter().find(|f| fields.contains_key(**f)) {
                return Err(invalid(&key, format!("field '{reserved}' is reserved")));
            }
            for required in required_fields {
                if fields.get(required).map_or(true, is_blank) {
                    return Err(invalid(&key, format!("required field '{required}' is missing or empty")));
                }
            }
            let metadata: Metadata = fields.into_iter().collect();
            if entries.insert(identifier.clone(), metadata).is_some() {
                return Err(invalid(&key, format!("duplicate entry for '{identifier}'")));
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Metadata fields for `identifier`.
    ///
    /// Fails with [`TemplateError::MissingMetadata`] rather than publishing an
    /// entry with made-up fields.
    pub fn merge(&self, identifier: &Identifier) -> Result<Metadata, TemplateError> {
        self.entries
            .get(identifier)
            .cloned()
            .ok_or_else(|| TemplateError::MissingMetadata {
                identifier: identifier.clone(),
            })
    }

    /// Identifiers from `ids` with no template entry, in input order.
    pub fn missing<'a>(&self, ids: impl IntoIterator<Item = &'a Identifier>) -> Vec<Identifier> {
        ids.into_iter()
            .filter(|id| !self.contains(id))
            .cloned()
            .collect()
    }

    /// Template identifiers that do not appear in `ids`.
    pub fn unused<'a>(&self, ids: impl IntoIterator<Item = &'a Identifier>) -> Vec<&Identifier> {
        let seen: std::collections::BTreeSet<&Identifier> = ids.into_iter().collect();
        self.entries.keys().filter(|id| !seen.contains(id)).collect()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
