//! Domain types for published documents and manifests.
//!
//! Manifests serialize with camelCase keys; these names are the wire format
//! read by clients and must not change without bumping [`SCHEMA_VERSION`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DigestParseError, IdentifierError};

/// Current manifest schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Directory (relative to the site root) holding content-addressed objects.
pub const OBJECTS_DIR: &str = "pdfs";

/// Entry keys owned by the publisher; templates may not set them.
pub const RESERVED_FIELDS: [&str; 4] = ["identifier", "digest", "sizeBytes", "url"];

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A normalised item identifier (e.g. an airport code).
///
/// Always upper-case, non-empty, and safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Trim, upper-case and validate a raw identifier (`" jfk "` → `JFK`).
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if let Some(found) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(IdentifierError::InvalidChar {
                raw: raw.to_owned(),
                found,
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// A SHA-256 content digest. Serialized as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl FromStr for ContentDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DigestParseError { raw: s.to_owned() };
        // Upper-case hex would decode fine but produce a different object path.
        if s.len() != 64 || s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(err());
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).map_err(|_| err())?;
        Ok(Self(out))
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DigestParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.to_hex()
    }
}

// ---------------------------------------------------------------------------
// Stored objects
// ---------------------------------------------------------------------------

/// `pdfs/<identifier>/<digest>.pdf`, relative to the site root and `/`-separated.
pub fn object_relative_path(identifier: &Identifier, digest: &ContentDigest) -> String {
    format!("{OBJECTS_DIR}/{identifier}/{digest}.pdf")
}

/// An immutable object in the content-addressed store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub identifier: Identifier,
    pub digest: ContentDigest,
    pub size: u64,
    /// Published path relative to the site root.
    pub relative_path: String,
}

impl StoredObject {
    pub fn new(identifier: Identifier, digest: ContentDigest, size: u64) -> Self {
        let relative_path = object_relative_path(&identifier, &digest);
        Self {
            identifier,
            digest,
            size,
            relative_path,
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Display fields merged from the template, ordered by key.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// One published document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub identifier: Identifier,
    pub digest: ContentDigest,
    pub size_bytes: u64,
    pub url: String,
    #[serde(flatten)]
    pub metadata: Metadata,
}

/// The manifest document clients poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: u32,
    #[serde(with = "rfc3339_seconds")]
    pub generated_at: DateTime<Utc>,
    #[serde(
        rename = "baseURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub base_url: Option<String>,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Look up an entry by identifier.
    pub fn entry(&self, identifier: &Identifier) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| &e.identifier == identifier)
    }

    /// Entries keyed by identifier.
    pub fn entries_by_id(&self) -> BTreeMap<&Identifier, &ManifestEntry> {
        self.entries.iter().map(|e| (&e.identifier, e)).collect()
    }

    /// Semantic equality: same entry set, ignoring order, timestamp and base URL.
    pub fn same_entries(&self, other: &Manifest) -> bool {
        self.entries.len() == other.entries.len() && self.entries_by_id() == other.entries_by_id()
    }

    /// Pretty JSON with a trailing newline. This exact byte form is what gets
    /// archived and published.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// `2026-10-19T08:30:00Z`: whole seconds, always `Z`.
pub mod rfc3339_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
