//! File catalog: the ordered set of descriptors a batch works through.
//!
//! Link generation lives outside this crate; catalogs are built either from
//! descriptors directly or from a JSON manifest such as:
//!
//! ```json
//! {
//!   "base_url": "https://patch.example.com/live/",
//!   "files": [
//!     { "path": "system/l2.ini", "length": 1024, "hash": "9e107d9d372bb6826bd81d3542a419d6" },
//!     { "key": "maps", "link": "https://cdn.example.com/maps.pak", "path": "maps/maps.pak" }
//!   ]
//! }
//! ```
//!
//! Entries without `key` use their path as key; entries without `link` resolve
//! their path against `base_url`.

use crate::error::{Error, Result};
use crate::types::FileDescriptor;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    base_url: Option<String>,
    files: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    link: Option<String>,
    path: String,
    #[serde(default)]
    length: Option<u64>,
    #[serde(default)]
    hash: Option<String>,
}

/// Ordered mapping of catalog key to descriptor
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<FileDescriptor>,
}

impl Catalog {
    /// Build a catalog, keeping the given order
    ///
    /// # Errors
    ///
    /// Returns [`Error::Manifest`] if two descriptors share a key.
    pub fn new(entries: Vec<FileDescriptor>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.key.as_str()) {
                return Err(Error::Manifest(format!("duplicate key '{}'", entry.key)));
            }
        }
        Ok(Self { entries })
    }

    /// Parse a JSON manifest
    pub fn from_manifest_str(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(content)?;
        let base = manifest
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| Error::Manifest(format!("invalid base_url '{raw}': {e}")))
            })
            .transpose()?;

        let mut entries = Vec::with_capacity(manifest.files.len());
        for entry in manifest.files {
            let link = match (entry.link, &base) {
                (Some(link), _) => link,
                (None, Some(base)) => base
                    .join(&entry.path)
                    .map_err(|e| Error::Manifest(format!("cannot resolve '{}': {e}", entry.path)))?
                    .to_string(),
                (None, None) => {
                    return Err(Error::Manifest(format!(
                        "'{}' has no link and the manifest has no base_url",
                        entry.path
                    )));
                }
            };

            entries.push(FileDescriptor {
                key: entry.key.unwrap_or_else(|| entry.path.clone()),
                link,
                path: entry.path,
                length: entry.length,
                hash: entry.hash,
            });
        }

        Self::new(entries)
    }

    /// Load and parse a JSON manifest file
    pub async fn from_manifest_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read manifest '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_manifest_str(&content)
    }

    /// Number of descriptors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no descriptors
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &FileDescriptor> {
        self.entries.iter()
    }

    /// Look up a descriptor by key
    pub fn get(&self, key: &str) -> Option<&FileDescriptor> {
        self.entries.iter().find(|entry| entry.key == key)
    }
}

impl IntoIterator for Catalog {
    type Item = FileDescriptor;
    type IntoIter = std::vec::IntoIter<FileDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
