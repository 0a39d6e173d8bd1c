//! Shared test utilities.
//!
//! Synthetic image builders and input-directory fixtures used by the codec,
//! transcoder and scheduler tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::imaging::Quality;
use crate::transcode::RenditionPlan;
use crate::types::{OutputFormat, RenditionSpec, SourceImage};

// =========================================================================
// Synthetic images
// =========================================================================

/// Encode a gradient JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut buf, 90,
        ))
        .unwrap();
    buf
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Temp input directory populated with `(file name, contents)` pairs.
///
/// With the mock codec, contents double as the decode tag, so a file
/// written as `"corrupt"` fails to decode.
pub fn input_dir(files: &[(&str, &[u8])]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (name, contents) in files {
        std::fs::write(tmp.path().join(name), contents).unwrap();
    }
    tmp
}

/// Source for `name` inside `dir`.
pub fn source(dir: &Path, name: &str) -> SourceImage {
    SourceImage::from_path(dir.join(name)).unwrap()
}

/// Plan with the given matrix writing into `out_dir`.
pub fn plan(out_dir: &Path, widths: &[u32], formats: &[OutputFormat]) -> RenditionPlan {
    RenditionPlan {
        specs: RenditionSpec::matrix(widths, formats),
        quality: Quality::new(80),
        out_dir: out_dir.to_path_buf(),
    }
}

/// Sorted file names in a directory.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// `dir/name` as a `PathBuf`, for readable assertions.
pub fn path_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

// =========================================================================
// Log capture
// =========================================================================

/// In-memory sink for a test-local `tracing` subscriber.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return its result plus every
/// `WARN`-or-worse line it logged on this thread.
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let lines = text.lines().map(str::to_string).collect();
    (result, lines)
}
