//! The run manifest: one entry per source, keyed by base name.
//!
//! Entries keep discovery order, which is also the order of keys in the
//! written JSON:
//!
//! ```json
//! {
//!   "photo": {
//!     "variants": [
//!       { "width": 600, "format": "jpg", "outputPath": "web/photo-600w.jpg", "status": "ok" }
//!     ],
//!     "lqip": { "dataUri": "data:image/png;base64,...", "width": 16, "height": 12 }
//!   }
//! }
//! ```
//!
//! A source whose placeholder could not be produced has `"lqip": null`.

use crate::types::{LqipResult, RenditionResult};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILENAME: &str = "imageData.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("cannot serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything produced for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub variants: Vec<RenditionResult>,
    pub lqip: LqipResult,
    /// False when the source could not be read or decoded. Not serialized;
    /// the failed variants already say so.
    pub decoded: bool,
}

impl ManifestEntry {
    pub fn ok_count(&self) -> usize {
        self.variants.iter().filter(|v| v.status.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.variants.len() - self.ok_count()
    }
}

impl Serialize for ManifestEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entry = serializer.serialize_struct("ManifestEntry", 2)?;
        entry.serialize_field("variants", &self.variants)?;
        entry.serialize_field("lqip", &self.lqip.placeholder)?;
        entry.end()
    }
}

/// Ordered mapping of base name → [`ManifestEntry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: Vec<(String, ManifestEntry)>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Callers insert in discovery order and keys are
    /// unique by construction (the scanner drops base-name collisions).
    pub fn push(&mut self, key: impl Into<String>, entry: ManifestEntry) {
        self.entries.push((key.into(), entry));
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

/// Pretty JSON (2-space indent), trailing newline.
pub fn to_json(manifest: &Manifest) -> Result<String, ManifestError> {
    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');
    Ok(json)
}

/// Write the manifest to `destination`, replacing any existing file.
pub fn write(manifest: &Manifest, destination: &Path) -> Result<(), ManifestError> {
    let json = to_json(manifest)?;
    std::fs::write(destination, json).map_err(|e| ManifestError::Write {
        path: destination.to_path_buf(),
        source: e,
    })
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: usize,
    pub renditions_ok: usize,
    pub renditions_failed: usize,
    pub decode_failures: usize,
    pub missing_placeholders: usize,
}

impl RunSummary {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        manifest
            .iter()
            .fold(RunSummary::default(), |mut summary, (_, entry)| {
                summary.sources += 1;
                summary.renditions_ok += entry.ok_count();
                summary.renditions_failed += entry.failed_count();
                summary.decode_failures += usize::from(!entry.decoded);
                summary.missing_placeholders += usize::from(entry.lqip.placeholder.is_none());
                summary
            })
    }

    pub fn has_failures(&self) -> bool {
        self.renditions_failed > 0 || self.decode_failures > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sources, {} renditions written, {} failed",
            self.sources, self.renditions_ok, self.renditions_failed
        )?;
        if self.decode_failures > 0 {
            write!(f, ", {} unreadable", self.decode_failures)?;
        }
        if self.missing_placeholders > 0 {
            write!(f, ", {} without placeholder", self.missing_placeholders)?;
        }
        Ok(())
    }
}
