//! Shared data model: sources, rendition specs and their results.
//!
//! These types flow from the scanner through the transcoder and scheduler
//! into the [`Manifest`](crate::manifest::Manifest). Result types serialize
//! directly into `imageData.json`, so their serde attributes define the
//! manifest's wire shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A matched input file.
///
/// `base_name` is the file name without its extension. It keys the manifest
/// entry and prefixes every output file for this source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub base_name: String,
}

impl SourceImage {
    /// Build a source from a path. Returns `None` when the path has no
    /// usable file stem (e.g. `..` or a non-UTF-8 name).
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let base_name = path.file_stem()?.to_str()?.to_string();
        if base_name.is_empty() {
            return None;
        }
        Some(Self { path, base_name })
    }

    /// File name as it appears on disk, for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.base_name.clone())
    }
}

/// Output raster format.
///
/// Parsing accepts the common spellings (`jpeg`, `.JPG`, `tif`); the
/// canonical extension returned by [`OutputFormat::extension`] is what lands
/// in file names and the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
    Tiff,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "avif" => Ok(Self::Avif),
            "gif" => Ok(Self::Gif),
            "tif" | "tiff" => Ok(Self::Tiff),
            _ => Err(format!(
                "unknown output format '{s}' (expected one of jpg, png, webp, avif, gif, tiff)"
            )),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.extension().to_string()
    }
}

/// One (width, format) pair to produce for every source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionSpec {
    pub width: u32,
    pub format: OutputFormat,
}

impl RenditionSpec {
    /// Expand widths × formats into specs, widths outermost.
    pub fn matrix(widths: &[u32], formats: &[OutputFormat]) -> Vec<Self> {
        widths
            .iter()
            .flat_map(|&width| formats.iter().map(move |&format| Self { width, format }))
            .collect()
    }

    /// Short label used in progress output, e.g. `600w.webp`.
    pub fn label(&self) -> String {
        format!("{}w.{}", self.width, self.format)
    }
}

/// Outcome of a single rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RenditionStatus {
    Ok,
    Failed { reason: String },
}

impl RenditionStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Manifest record for one produced (or failed) rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenditionResult {
    pub width: u32,
    pub format: OutputFormat,
    pub output_path: String,
    #[serde(flatten)]
    pub status: RenditionStatus,
}

impl RenditionResult {
    pub fn ok(spec: RenditionSpec, output_path: &Path) -> Self {
        Self {
            width: spec.width,
            format: spec.format,
            output_path: output_path.to_string_lossy().into_owned(),
            status: RenditionStatus::Ok,
        }
    }

    pub fn failed(spec: RenditionSpec, output_path: &Path, reason: impl Into<String>) -> Self {
        Self {
            width: spec.width,
            format: spec.format,
            output_path: output_path.to_string_lossy().into_owned(),
            status: RenditionStatus::Failed {
                reason: reason.into(),
            },
        }
    }
}

/// Inline placeholder image, ready to drop into an `<img src>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placeholder {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

/// Placeholder outcome for one source. `placeholder` is `None` when
/// generation failed; the entry is still written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LqipResult {
    pub source_key: String,
    pub placeholder: Option<Placeholder>,
}
