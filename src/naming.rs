//! File naming for inputs and outputs.
//!
//! Outputs follow `{base_name}-{width}w.{ext}`: the width suffix matches the
//! `w` descriptor used in `srcset`, so a consumer can build
//! `photo-600w.webp 600w, photo-1200w.webp 1200w` straight from the names.
//!
//! Input extensions are compared case-insensitively and the leading dot is
//! optional on both sides (`.JPG`, `jpg` and `.jpg` are the same filter).

use crate::types::RenditionSpec;
use std::path::Path;

/// Output file name for one rendition of a source.
///
/// - `("photo", 600w jpg)` → `photo-600w.jpg`
/// - `("my.photo", 1200w webp)` → `my.photo-1200w.webp`
pub fn rendition_file_name(base_name: &str, spec: &RenditionSpec) -> String {
    format!("{}-{}w.{}", base_name, spec.width, spec.format.extension())
}

/// Normalize an extension for comparison: trimmed, lowercase, no leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Whether `path` has one of the `allowed` extensions.
///
/// `allowed` entries are expected to be normalized already
/// (see [`normalize_extension`]).
pub fn has_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(normalize_extension)
        .is_some_and(|ext| allowed.iter().any(|a| *a == ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputFormat;

    fn spec(width: u32, format: OutputFormat) -> RenditionSpec {
        RenditionSpec { width, format }
    }

    #[test]
    fn rendition_name_uses_width_descriptor() {
        assert_eq!(
            rendition_file_name("photo", &spec(600, OutputFormat::Jpeg)),
            "photo-600w.jpg"
        );
        assert_eq!(
            rendition_file_name("photo", &spec(1200, OutputFormat::WebP)),
            "photo-1200w.webp"
        );
    }

    #[test]
    fn rendition_name_keeps_inner_dots() {
        assert_eq!(
            rendition_file_name("my.photo", &spec(800, OutputFormat::Avif)),
            "my.photo-800w.avif"
        );
    }

    #[test]
    fn normalize_strips_dot_and_case() {
        assert_eq!(normalize_extension(".JPG"), "jpg");
        assert_eq!(normalize_extension("webp"), "webp");
        assert_eq!(normalize_extension(" .Png "), "png");
    }

    #[test]
    fn allowed_extension_is_case_insensitive() {
        let allowed = vec!["jpg".to_string(), "png".to_string()];
        assert!(has_allowed_extension(Path::new("a/photo.JPG"), &allowed));
        assert!(has_allowed_extension(Path::new("b.png"), &allowed));
        assert!(!has_allowed_extension(Path::new("notes.txt"), &allowed));
        assert!(!has_allowed_extension(Path::new("README"), &allowed));
    }

    #[test]
    fn allowed_extension_ignores_compound_suffix() {
        let allowed = vec!["jpg".to_string()];
        assert!(!has_allowed_extension(Path::new("photo.jpg.bak"), &allowed));
    }
}
