//! Per-file rendition fan-out.
//!
//! A [`FileTranscoder`] reads and decodes a source once, then produces every
//! rendition of the [`RenditionPlan`] from that single decode:
//!
//! ```text
//!                      ┌─▶ 600w.jpg   ─▶ photo-600w.jpg
//! photo.jpg ─▶ decode ─┼─▶ 600w.webp  ─▶ photo-600w.webp
//!                      ├─▶ 1200w.jpg  ─▶ photo-1200w.jpg
//!                      └─▶ 1200w.webp ─▶ photo-1200w.webp
//! ```
//!
//! Each branch runs on its own scoped thread holding a shared reference to
//! the decoded image. There is no cap on branches: a plan of W widths × F
//! formats gets W×F workers.
//!
//! ## Failure Scope
//!
//! - Read or decode failure: every rendition of that source is recorded as
//!   failed with the same reason, logged once.
//! - Encode or write failure: only that rendition fails; siblings continue.

use crate::imaging::{CodecError, ImageCodec, Quality};
use crate::naming::rendition_file_name;
use crate::types::{RenditionResult, RenditionSpec, SourceImage};
use std::path::{Path, PathBuf};
use std::thread;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error(transparent)]
    Encode(#[from] CodecError),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to produce for every source of a run.
#[derive(Debug, Clone)]
pub struct RenditionPlan {
    /// Widths × formats, in manifest order.
    pub specs: Vec<RenditionSpec>,
    /// Quality shared by every rendition.
    pub quality: Quality,
    /// Directory all renditions are written to.
    pub out_dir: PathBuf,
}

impl RenditionPlan {
    /// Expand the plan into concrete jobs for one source.
    pub fn jobs<'a>(&self, source: &'a SourceImage) -> Vec<RenditionJob<'a>> {
        self.specs
            .iter()
            .map(|spec| RenditionJob {
                source,
                spec: *spec,
                output: self
                    .out_dir
                    .join(rendition_file_name(&source.base_name, spec)),
            })
            .collect()
    }
}

/// One source → one (width, format) output file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenditionJob<'a> {
    pub source: &'a SourceImage,
    pub spec: RenditionSpec,
    pub output: PathBuf,
}

pub struct FileTranscoder<'a, C: ImageCodec> {
    codec: &'a C,
    plan: &'a RenditionPlan,
}

impl<'a, C: ImageCodec> FileTranscoder<'a, C> {
    pub fn new(codec: &'a C, plan: &'a RenditionPlan) -> Self {
        Self { codec, plan }
    }

    /// Decode `source` once and produce every rendition of the plan.
    pub fn transcode(&self, source: &SourceImage) -> Vec<RenditionResult> {
        match self.decode(source) {
            Ok(image) => self.render(source, &image),
            Err(e) => self.fail_all(source, &e.to_string()),
        }
    }

    /// Read and decode a source.
    pub fn decode(&self, source: &SourceImage) -> Result<C::Image, TranscodeError> {
        let bytes = std::fs::read(&source.path).map_err(|e| TranscodeError::Read {
            path: source.path.clone(),
            source: e,
        })?;
        self.codec
            .decode(&bytes)
            .map_err(|e| TranscodeError::Decode {
                path: source.path.clone(),
                source: e,
            })
    }

    /// Produce every rendition from an already-decoded image.
    ///
    /// Results come back in plan order regardless of which branch finishes
    /// first.
    pub fn render(&self, source: &SourceImage, image: &C::Image) -> Vec<RenditionResult> {
        let jobs = self.plan.jobs(source);

        thread::scope(|scope| {
            let branches: Vec<_> = jobs
                .iter()
                .map(|job| {
                    let spawned = thread::Builder::new()
                        .name(format!("{}-{}", source.base_name, job.spec.label()))
                        .spawn_scoped(scope, move || self.render_job(job, image));
                    (job, spawned)
                })
                .collect();

            branches
                .into_iter()
                .map(|(job, spawned)| {
                    let outcome = match spawned {
                        Ok(handle) => handle
                            .join()
                            .unwrap_or_else(|_| Err(panicked(job))),
                        // Out of threads: run the branch here instead of dropping it.
                        Err(_) => self.render_job(job, image),
                    };
                    match outcome {
                        Ok(()) => {
                            debug!(output = %job.output.display(), "rendition written");
                            RenditionResult::ok(job.spec, &job.output)
                        }
                        Err(e) => {
                            warn!(source = %source.file_name(), rendition = %job.spec.label(), "{e}");
                            RenditionResult::failed(job.spec, &job.output, e.to_string())
                        }
                    }
                })
                .collect()
        })
    }

    /// Record every rendition of `source` as failed with one shared reason.
    pub fn fail_all(&self, source: &SourceImage, reason: &str) -> Vec<RenditionResult> {
        warn!(
            source = %source.file_name(),
            renditions = self.plan.specs.len(),
            "{reason}; skipping all renditions"
        );
        self.plan
            .jobs(source)
            .into_iter()
            .map(|job| RenditionResult::failed(job.spec, &job.output, reason))
            .collect()
    }

    fn render_job(&self, job: &RenditionJob<'_>, image: &C::Image) -> Result<(), TranscodeError> {
        let bytes = self
            .codec
            .encode(image, job.spec.width, job.spec.format, self.plan.quality)?;
        write_output(&job.output, &bytes)
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), TranscodeError> {
    std::fs::write(path, bytes).map_err(|e| TranscodeError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

fn panicked(job: &RenditionJob<'_>) -> TranscodeError {
    TranscodeError::Encode(CodecError::Encode(format!(
        "worker for {} panicked",
        job.spec.label()
    )))
}
