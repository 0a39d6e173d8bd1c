//! Input discovery.
//!
//! Lists the immediate children of the input directory (no recursion) and
//! keeps regular files whose extension is in the accepted list:
//!
//! ```text
//! photos/
//! ├── beach.png        ✓  → "beach"
//! ├── notes.txt        ✗  extension not accepted
//! ├── photo.JPG        ✓  → "photo"   (extensions compare case-insensitively)
//! ├── photo.webp       ✗  base name "photo" already taken
//! └── raw/             ✗  directories are never descended into
//! ```
//!
//! Results come back in file-name order. That order is the discovery order
//! used for FIFO admission and for the keys of the manifest, so two runs over
//! the same directory agree.

use crate::naming::has_allowed_extension;
use crate::types::SourceImage;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("input directory not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("input path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot read input directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot list input directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Enumerate the sources in `dir` accepted by `extensions`.
///
/// `extensions` must already be normalized (lowercase, no leading dot).
pub fn scan(dir: &Path, extensions: &[String]) -> Result<Vec<SourceImage>, ScanError> {
    let meta = std::fs::metadata(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::NotFound(dir.to_path_buf()),
        _ => ScanError::Io {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut sources = Vec::new();
    let mut taken = HashSet::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // A dangling symlink or an entry that vanished mid-listing
            Err(e) if e.depth() > 0 => {
                warn!("skipping unreadable entry: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if !entry.file_type().is_file() || !has_allowed_extension(entry.path(), extensions) {
            continue;
        }
        let Some(source) = SourceImage::from_path(entry.path()) else {
            warn!(path = %entry.path().display(), "skipping file without a usable name");
            continue;
        };
        if !taken.insert(source.base_name.clone()) {
            warn!(
                source = %source.file_name(),
                key = %source.base_name,
                "skipping: another source already uses this base name"
            );
            continue;
        }
        debug!(source = %source.file_name(), "matched");
        sources.push(source);
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::normalize_extension;
    use crate::test_helpers::{input_dir, path_in};

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|e| normalize_extension(e)).collect()
    }

    fn names(sources: &[SourceImage]) -> Vec<&str> {
        sources.iter().map(|s| s.base_name.as_str()).collect()
    }

    #[test]
    fn matches_by_extension_in_file_name_order() {
        let dir = input_dir(&[
            ("zeta.jpg", b"z"),
            ("alpha.png", b"a"),
            ("notes.txt", b"n"),
            ("mid.webp", b"m"),
        ]);

        let sources = scan(dir.path(), &exts(&[".jpg", ".png", ".webp"])).unwrap();

        assert_eq!(names(&sources), vec!["alpha", "mid", "zeta"]);
        assert_eq!(sources[0].path, path_in(dir.path(), "alpha.png"));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = input_dir(&[("LOUD.JPG", b"x"), ("quiet.Png", b"y")]);

        let sources = scan(dir.path(), &exts(&["jpg", ".PNG"])).unwrap();

        assert_eq!(names(&sources), vec!["LOUD", "quiet"]);
    }

    #[test]
    fn does_not_recurse() {
        let dir = input_dir(&[("top.jpg", b"t")]);
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("deep.jpg"), b"d").unwrap();
        std::fs::create_dir(dir.path().join("folder.jpg")).unwrap();

        let sources = scan(dir.path(), &exts(&["jpg"])).unwrap();

        assert_eq!(names(&sources), vec!["top"]);
    }

    #[test]
    fn files_without_extension_are_ignored() {
        let dir = input_dir(&[("README", b"r"), ("photo.jpg", b"p")]);

        let sources = scan(dir.path(), &exts(&["jpg"])).unwrap();

        assert_eq!(names(&sources), vec!["photo"]);
    }

    #[test]
    fn base_name_collision_keeps_first() {
        let dir = input_dir(&[("photo.webp", b"w"), ("photo.jpg", b"j"), ("other.png", b"o")]);

        let sources = scan(dir.path(), &exts(&["jpg", "webp", "png"])).unwrap();

        assert_eq!(names(&sources), vec!["other", "photo"]);
        assert_eq!(sources[1].path, path_in(dir.path(), "photo.jpg"));
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = input_dir(&[]);
        assert!(scan(dir.path(), &exts(&["jpg"])).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = input_dir(&[]);
        let missing = dir.path().join("absent");

        let err = scan(&missing, &exts(&["jpg"])).unwrap_err();

        assert!(matches!(err, ScanError::NotFound(p) if p == missing));
    }

    #[test]
    fn file_as_input_is_an_error() {
        let dir = input_dir(&[("photo.jpg", b"p")]);

        let err = scan(&dir.path().join("photo.jpg"), &exts(&["jpg"])).unwrap_err();

        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped() {
        let dir = input_dir(&[("real.jpg", b"r")]);
        std::os::unix::fs::symlink(dir.path().join("gone.jpg"), dir.path().join("link.jpg"))
            .unwrap();

        let sources = scan(dir.path(), &exts(&["jpg"])).unwrap();

        assert_eq!(names(&sources), vec!["real"]);
    }
}
