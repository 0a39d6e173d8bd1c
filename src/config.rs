//! Run configuration.
//!
//! Settings are layered: stock defaults, then an optional `respimg.toml`,
//! then command-line flags. Each layer only needs the keys it overrides.
//!
//! ## Config File Location
//!
//! `--config <path>` selects a file explicitly. Without it, `respimg.toml` in
//! the input directory is used when present.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! widths = [600, 800, 1200, 1800, 2400]  # Target widths in pixels
//! formats = ["jpg", "webp"]              # Output formats (jpg, png, webp, avif, gif, tiff)
//! quality = 80                           # Encode quality (1-100)
//!
//! [input]
//! extensions = [".jpg", ".jpeg", ".avif", ".webp", ".png", ".gif", ".svg"]
//!
//! [processing]
//! max_parallel = 5                       # Source files processed at once
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use crate::naming::normalize_extension;
use crate::types::{OutputFormat, RenditionSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the input directory.
pub const CONFIG_FILENAME: &str = "respimg.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete run configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Rendition matrix and encode quality.
    pub images: ImagesConfig,
    /// Input file filter.
    pub input: InputConfig,
    /// Parallelism settings.
    pub processing: ProcessingConfig,
}

/// Which renditions to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Target widths in pixels. Sources are scaled to each width, upscaling if needed.
    pub widths: Vec<u32>,
    /// Output formats; every width is produced in every format.
    pub formats: Vec<OutputFormat>,
    /// Encode quality shared by all renditions (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            widths: vec![600, 800, 1200, 1800, 2400],
            formats: vec![OutputFormat::Jpeg, OutputFormat::WebP],
            quality: 80,
        }
    }
}

/// Which files in the input directory are sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Accepted extensions, case-insensitive, leading dot optional.
    pub extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extensions: [".jpg", ".jpeg", ".avif", ".webp", ".png", ".gif", ".svg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of source files processed at the same time.
    pub max_parallel: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { max_parallel: 5 }
    }
}

impl RunConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.widths.is_empty() {
            return Err(ConfigError::Validation(
                "images.widths must not be empty".into(),
            ));
        }
        if self.images.widths.contains(&0) {
            return Err(ConfigError::Validation(
                "images.widths values must be positive".into(),
            ));
        }
        if self.images.formats.is_empty() {
            return Err(ConfigError::Validation(
                "images.formats must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.input.extensions.iter().all(|e| normalize_extension(e).is_empty()) {
            return Err(ConfigError::Validation(
                "input.extensions must not be empty".into(),
            ));
        }
        if self.processing.max_parallel == 0 {
            return Err(ConfigError::Validation(
                "processing.max_parallel must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Rendition matrix with duplicate widths and formats removed
    /// (first occurrence wins). Duplicates would target the same output file.
    pub fn rendition_specs(&self) -> Vec<RenditionSpec> {
        let mut widths = Vec::new();
        for w in &self.images.widths {
            if !widths.contains(w) {
                widths.push(*w);
            }
        }
        let mut formats = Vec::new();
        for f in &self.images.formats {
            if !formats.contains(f) {
                formats.push(*f);
            }
        }
        RenditionSpec::matrix(&widths, &formats)
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.images.quality)
    }

    /// Normalized, de-duplicated input extensions.
    pub fn input_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = Vec::new();
        for ext in self.input.extensions.iter().map(|e| normalize_extension(e)) {
            if !ext.is_empty() && !exts.contains(&ext) {
                exts.push(ext);
            }
        }
        exts
    }
}

/// Values supplied on the command line. `None` leaves the file/default
/// value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub widths: Option<Vec<u32>>,
    pub formats: Option<Vec<OutputFormat>>,
    pub quality: Option<u32>,
    pub extensions: Option<Vec<String>>,
    pub max_parallel: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut RunConfig) {
        if let Some(widths) = self.widths {
            config.images.widths = widths;
        }
        if let Some(formats) = self.formats {
            config.images.formats = formats;
        }
        if let Some(quality) = self.quality {
            config.images.quality = quality;
        }
        if let Some(extensions) = self.extensions {
            config.input.extensions = extensions;
        }
        if let Some(max_parallel) = self.max_parallel {
            config.processing.max_parallel = max_parallel;
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(RunConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults and deserialize.
///
/// Validation is left to the caller so CLI overrides can be applied first.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<RunConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RunConfig = merged.try_into()?;
    Ok(config)
}

/// Load the run config.
///
/// An explicit path must exist; otherwise `respimg.toml` in `input_dir` is
/// used if present, and stock defaults if not.
pub fn load_config(explicit: Option<&Path>, input_dir: &Path) -> Result<RunConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => Some(load_raw_config(path)?.ok_or_else(|| ConfigError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        })?),
        None => load_raw_config(&input_dir.join(CONFIG_FILENAME))?,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `respimg.toml`.
///
/// Printed by `respimg --gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# respimg configuration
# =====================
# All settings are optional. Values shown below are the defaults.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Renditions
# ---------------------------------------------------------------------------
[images]
# Target widths in pixels. Every width is produced in every format.
widths = [600, 800, 1200, 1800, 2400]

# Output formats: jpg, png, webp, avif, gif, tiff.
formats = ["jpg", "webp"]

# Encode quality shared by all renditions (1 = worst, 100 = best).
quality = 80

# ---------------------------------------------------------------------------
# Input filter
# ---------------------------------------------------------------------------
[input]
# Files in the input directory with these extensions are processed.
# Case-insensitive; the leading dot is optional.
extensions = [".jpg", ".jpeg", ".avif", ".webp", ".png", ".gif", ".svg"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Source files processed at the same time. Each file additionally fans out
# into one worker per rendition.
max_parallel = 5
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = RunConfig::default();
        assert_eq!(config.images.widths, vec![600, 800, 1200, 1800, 2400]);
        assert_eq!(
            config.images.formats,
            vec![OutputFormat::Jpeg, OutputFormat::WebP]
        );
        assert_eq!(config.images.quality, 80);
        assert_eq!(config.processing.max_parallel, 5);
        assert_eq!(
            config.input_extensions(),
            vec!["jpg", "jpeg", "avif", "webp", "png", "gif", "svg"]
        );
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let config: RunConfig = toml::from_str(
            r#"
[images]
widths = [320]
"#,
        )
        .unwrap();
        assert_eq!(config.images.widths, vec![320]);
        assert_eq!(config.images.quality, 80);
        assert_eq!(config.processing.max_parallel, 5);
    }

    #[test]
    fn parse_format_aliases() {
        let config: RunConfig = toml::from_str(
            r#"
[images]
formats = ["jpeg", "AVIF"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.images.formats,
            vec![OutputFormat::Jpeg, OutputFormat::Avif]
        );
    }

    #[test]
    fn unknown_format_rejected() {
        let result: Result<RunConfig, _> = toml::from_str(
            r#"
[images]
formats = ["heic"]
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<RunConfig, _> = toml::from_str(
            r#"
[images]
sizes = [100]
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<RunConfig, _> = toml::from_str("[theme]\ncolor = \"red\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_empty_widths() {
        let mut config = RunConfig::default();
        config.images.widths.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_width() {
        let mut config = RunConfig::default();
        config.images.widths = vec![600, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_formats() {
        let mut config = RunConfig::default();
        config.images.formats.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = RunConfig::default();
        config.images.quality = 0;
        assert!(config.validate().is_err());
        config.images.quality = 101;
        assert!(config.validate().is_err());
        config.images.quality = 1;
        assert!(config.validate().is_ok());
        config.images.quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_extensions() {
        let mut config = RunConfig::default();
        config.input.extensions = vec![".".to_string(), " ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_parallelism() {
        let mut config = RunConfig::default();
        config.processing.max_parallel = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rendition_specs_dedupes() {
        let mut config = RunConfig::default();
        config.images.widths = vec![600, 600, 1200];
        config.images.formats = vec![OutputFormat::Jpeg, OutputFormat::Jpeg, OutputFormat::WebP];
        let labels: Vec<String> = config.rendition_specs().iter().map(|s| s.label()).collect();
        assert_eq!(
            labels,
            vec!["600w.jpg", "600w.webp", "1200w.jpg", "1200w.webp"]
        );
    }

    #[test]
    fn input_extensions_normalized_and_deduped() {
        let mut config = RunConfig::default();
        config.input.extensions = vec![".JPG".into(), "jpg".into(), "png".into()];
        assert_eq!(config.input_extensions(), vec!["jpg", "png"]);
    }

    #[test]
    fn overrides_only_replace_given_values() {
        let mut config = RunConfig::default();
        ConfigOverrides {
            quality: Some(60),
            max_parallel: Some(2),
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.images.quality, 60);
        assert_eq!(config.processing.max_parallel, 2);
        assert_eq!(config.images.widths, vec![600, 800, 1200, 1800, 2400]);
    }

    // =========================================================================
    // merge / load tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("[images]\nquality = 80\nwidths = [1]").unwrap();
        let overlay: toml::Value = toml::from_str("[images]\nquality = 50").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["images"]["quality"].as_integer(), Some(50));
        assert!(merged["images"].get("widths").is_some());
    }

    #[test]
    fn merge_toml_array_replaced_not_appended() {
        let base: toml::Value = toml::from_str("widths = [1, 2, 3]").unwrap();
        let overlay: toml::Value = toml::from_str("widths = [9]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["widths"].as_array().map(|a| a.len()), Some(1));
    }

    #[test]
    fn load_config_defaults_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn load_config_reads_file_in_input_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[images]\nquality = 65\n[processing]\nmax_parallel = 2\n",
        )
        .unwrap();
        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config.images.quality, 65);
        assert_eq!(config.processing.max_parallel, 2);
        assert_eq!(config.images.formats, vec![OutputFormat::Jpeg, OutputFormat::WebP]);
    }

    #[test]
    fn load_config_explicit_missing_file_errors() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")), tmp.path());
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_config_invalid_toml_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "[images\nquality = ").unwrap();
        assert!(matches!(
            load_config(Some(&path), tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: RunConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        for section in ["images", "input", "processing"] {
            assert!(value.get(section).is_some(), "missing section {section}");
        }
    }
}
