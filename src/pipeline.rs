//! One complete run: config → scan → process → manifest.
//!
//! ```text
//! Scanning ─▶ Dispatching ─▶ Aggregating ─▶ Writing ─▶ Done
//!    │                                        │
//!    └──────────────▶ AbortedFatal ◀──────────┘
//! ```
//!
//! Only setup problems abort a run: invalid config, an unreadable input
//! directory, an output directory that cannot be created, or a manifest that
//! cannot be written. Everything that goes wrong with an individual file is
//! recorded in the manifest and the run carries on.

use crate::config::{ConfigError, RunConfig};
use crate::imaging::ImageCodec;
use crate::manifest::{self, MANIFEST_FILENAME, Manifest, ManifestError, RunSummary};
use crate::process::{self, ProcessError, ProcessEvent};
use crate::scan::{self, ScanError};
use crate::transcode::RenditionPlan;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("cannot create output directory {}: {source}", path.display())]
    CreateOutDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Where a run currently is, as reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Scanning,
    Dispatching,
    Aggregating,
    Writing,
    Done,
    AbortedFatal,
}

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_dir: PathBuf,
    pub out_dir: PathBuf,
    pub config: RunConfig,
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub summary: RunSummary,
}

/// Execute a full run with `codec`.
///
/// Progress events go to `events` when provided; the sender is dropped
/// before this returns, so a consumer iterating the receiver terminates.
pub fn run<C: ImageCodec>(
    codec: &C,
    options: &RunOptions,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunReport, PipelineError> {
    execute(codec, options, events).inspect_err(|e| {
        error!(stage = ?RunStage::AbortedFatal, "{e}");
    })
}

fn execute<C: ImageCodec>(
    codec: &C,
    options: &RunOptions,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunReport, PipelineError> {
    let config = &options.config;
    config.validate()?;

    info!(stage = ?RunStage::Scanning, dir = %options.input_dir.display());
    let sources = scan::scan(&options.input_dir, &config.input_extensions())?;

    std::fs::create_dir_all(&options.out_dir).map_err(|e| PipelineError::CreateOutDir {
        path: options.out_dir.clone(),
        source: e,
    })?;

    let plan = RenditionPlan {
        specs: config.rendition_specs(),
        quality: config.quality(),
        out_dir: options.out_dir.clone(),
    };

    info!(stage = ?RunStage::Dispatching, sources = sources.len());
    let manifest = process::run(
        codec,
        &sources,
        &plan,
        config.processing.max_parallel,
        events,
    )?;
    info!(stage = ?RunStage::Aggregating, entries = manifest.len());

    let manifest_path = options.out_dir.join(MANIFEST_FILENAME);
    info!(stage = ?RunStage::Writing, path = %manifest_path.display());
    manifest::write(&manifest, &manifest_path)?;

    let summary = RunSummary::from_manifest(&manifest);
    info!(stage = ?RunStage::Done, "{summary}");
    Ok(RunReport {
        manifest_path,
        manifest,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::codec::tests::MockCodec;
    use crate::test_helpers::{file_names, input_dir};
    use crate::types::OutputFormat;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn options(input: &std::path::Path, out: &std::path::Path) -> RunOptions {
        let mut config = RunConfig::default();
        config.images.widths = vec![600, 1200];
        config.images.formats = vec![OutputFormat::Jpeg, OutputFormat::WebP];
        RunOptions {
            input_dir: input.to_path_buf(),
            out_dir: out.to_path_buf(),
            config,
        }
    }

    #[test]
    fn run_writes_renditions_and_manifest() {
        let input = input_dir(&[("photo.jpg", b"photo"), ("notes.txt", b"text")]);
        let out = TempDir::new().unwrap();
        let out_dir = out.path().join("web");

        let report = run(&MockCodec::new(), &options(input.path(), &out_dir), None).unwrap();

        assert_eq!(report.manifest_path, out_dir.join("imageData.json"));
        assert_eq!(
            file_names(&out_dir),
            vec![
                "imageData.json",
                "photo-1200w.jpg",
                "photo-1200w.webp",
                "photo-600w.jpg",
                "photo-600w.webp"
            ]
        );
        assert_eq!(report.summary.sources, 1);
        assert_eq!(report.summary.renditions_ok, 4);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.manifest_path).unwrap())
                .unwrap();
        assert_eq!(json["photo"]["variants"].as_array().unwrap().len(), 4);
        assert_eq!(json["photo"]["lqip"]["width"], 16);
    }

    #[test]
    fn empty_input_writes_empty_manifest() {
        let input = input_dir(&[]);
        let out = TempDir::new().unwrap();

        let report = run(&MockCodec::new(), &options(input.path(), out.path()), None).unwrap();

        assert_eq!(
            std::fs::read_to_string(&report.manifest_path).unwrap(),
            "{}\n"
        );
        assert_eq!(report.summary, RunSummary::default());
    }

    #[test]
    fn invalid_config_aborts_before_scanning() {
        let out = TempDir::new().unwrap();
        let mut opts = options(&out.path().join("missing"), &out.path().join("web"));
        opts.config.images.widths.clear();

        let err = run(&MockCodec::new(), &opts, None).unwrap_err();

        assert!(matches!(err, PipelineError::Config(ConfigError::Validation(_))));
        assert!(!out.path().join("web").exists());
    }

    #[test]
    fn missing_input_dir_is_fatal() {
        let out = TempDir::new().unwrap();
        let opts = options(&out.path().join("missing"), &out.path().join("web"));

        let err = run(&MockCodec::new(), &opts, None).unwrap_err();

        assert!(matches!(err, PipelineError::Scan(ScanError::NotFound(_))));
        assert!(!out.path().join("web").exists());
    }

    #[test]
    fn uncreatable_out_dir_is_fatal() {
        let input = input_dir(&[("photo.jpg", b"photo")]);
        let blocker = TempDir::new().unwrap();
        let file = blocker.path().join("occupied");
        std::fs::write(&file, b"not a directory").unwrap();

        let err = run(&MockCodec::new(), &options(input.path(), &file.join("web")), None)
            .unwrap_err();

        assert!(matches!(err, PipelineError::CreateOutDir { .. }));
    }

    #[test]
    fn corrupt_file_does_not_abort() {
        let input = input_dir(&[("bad.png", b"corrupt"), ("good.png", b"good")]);
        let out = TempDir::new().unwrap();

        let report = run(&MockCodec::new(), &options(input.path(), out.path()), None).unwrap();

        assert_eq!(report.summary.sources, 2);
        assert_eq!(report.summary.decode_failures, 1);
        assert_eq!(report.summary.renditions_failed, 4);
        assert_eq!(report.summary.renditions_ok, 4);
    }

    #[test]
    fn events_channel_closes_when_run_returns() {
        let input = input_dir(&[("a.jpg", b"a"), ("b.jpg", b"b")]);
        let out = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();

        run(&MockCodec::new(), &options(input.path(), out.path()), Some(tx)).unwrap();

        assert_eq!(rx.iter().count(), 2);
    }
}
