//! # respimg
//!
//! Batch generator for responsive images. Point it at a directory of photos
//! and it writes every source at every configured width in every configured
//! format, plus a tiny inline placeholder, and records all of it in one JSON
//! manifest a site build can consume.
//!
//! # Pipeline
//!
//! ```text
//! photos/                       web/
//! ├── beach.png    ──scan──▶    ├── beach-600w.jpg
//! └── photo.jpg                 ├── beach-600w.webp
//!                               ├── ...
//!                               ├── photo-2400w.webp
//!                               └── imageData.json
//! ```
//!
//! 1. **Scan**: list matching files in the input directory, in file-name order.
//! 2. **Process**: a bounded pool runs one task per file. Each task decodes
//!    its source once, fans out every (width, format) rendition against that
//!    decode, and derives the placeholder from it too.
//! 3. **Write**: results are aggregated in discovery order and written as
//!    `imageData.json`.
//!
//! A file that fails to decode, or a rendition that fails to encode, is
//! recorded as failed in the manifest. It never stops the run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | One complete run: config → scan → process → manifest |
//! | [`scan`] | Discovers source files |
//! | [`process`] | Bounded FIFO file pool and single-owner aggregation |
//! | [`transcode`] | Decode-once, fan-out-many rendition production for one file |
//! | [`lqip`] | Base64 PNG placeholders |
//! | [`manifest`] | Ordered manifest model, JSON writer, run summary |
//! | [`imaging`] | Codec trait and the pure-Rust implementation |
//! | [`config`] | Layered `respimg.toml` loading, CLI overrides, validation |
//! | [`types`] | Shared data model |
//! | [`naming`] | Output file naming and extension matching |
//! | [`output`] | CLI output formatting |
//!
//! # Pure-Rust Imaging
//!
//! Decoding, resizing and encoding use the `image` crate; AVIF input goes
//! through `avif-parse` and `rav1d`, AVIF output through `rav1e`. No system
//! libraries are needed, so the binary runs anywhere it builds.

pub mod config;
pub mod imaging;
pub mod lqip;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod scan;
pub mod transcode;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
