//! Bounded file scheduling and manifest aggregation.
//!
//! Every source becomes one file task. Tasks run on a dedicated rayon pool
//! with exactly `concurrency_limit` threads and are admitted in discovery
//! order (FIFO), so at most `concurrency_limit` files are being decoded or
//! encoded at any moment:
//!
//! ```text
//!   sources (discovery order)      file pool (limit = 2)          aggregator
//!  ┌─────────────────────────┐    ┌──────────────────────┐     ┌─────────────┐
//!  │ a.jpg b.jpg c.jpg d.jpg │ ─▶ │ worker 0: a.jpg      │ ──▶ │ slot[0] = a │
//!  └─────────────────────────┘    │ worker 1: b.jpg      │ mpsc│ slot[1] = b │
//!            queued FIFO          └──────────────────────┘     │ ...         │
//!                                                              └─────────────┘
//! ```
//!
//! Inside a task the source is decoded once; renditions fan out on scoped
//! threads (see [`transcode`](crate::transcode)) and the placeholder is
//! derived from the same decode. Rendition threads never run on the file
//! pool, so a task waiting on its renditions cannot pick up another file.
//!
//! ## Isolation
//!
//! A failing or panicking file task only affects its own entry. Completed
//! entries are sent over a channel to a single aggregator thread, the only
//! owner of the results. Any slot still empty when every task has settled
//! is filled with failed variants, so each source appears exactly once.
//!
//! ## Progress
//!
//! When the caller passes an event sender, the aggregator emits one
//! [`ProcessEvent::FileCompleted`] per source as it lands. The CLI prints
//! these from a separate thread.

use crate::imaging::ImageCodec;
use crate::lqip::{self, LqipGenerator};
use crate::manifest::{Manifest, ManifestEntry};
use crate::transcode::{FileTranscoder, RenditionPlan};
use crate::types::{RenditionStatus, SourceImage};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("result aggregator stopped unexpectedly")]
    Aggregator,
}

/// Lifecycle of one file task, as reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Queued,
    Running,
    Completed,
    CompletedWithFailures,
}

impl FileState {
    fn settled(entry: &ManifestEntry) -> Self {
        if entry.failed_count() == 0 && entry.lqip.placeholder.is_some() {
            Self::Completed
        } else {
            Self::CompletedWithFailures
        }
    }
}

/// Progress event sent while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    FileCompleted {
        /// 1-based position in discovery order.
        index: usize,
        total: usize,
        /// Manifest key (base name).
        key: String,
        file_name: String,
        variants: Vec<VariantInfo>,
        /// Whether a placeholder was produced.
        placeholder: bool,
    },
}

/// Display summary of one rendition within a [`ProcessEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariantInfo {
    /// e.g. `600w.webp`
    pub label: String,
    pub status: VariantStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantStatus {
    Written,
    Failed(String),
}

/// One settled file task on its way to the aggregator.
struct FileDone {
    index: usize,
    file_name: String,
    entry: ManifestEntry,
}

/// Process every source and assemble the manifest.
///
/// Returns once every file task has settled. The manifest holds exactly one
/// entry per source, in the order of `sources`.
pub fn run<C: ImageCodec>(
    codec: &C,
    sources: &[SourceImage],
    plan: &RenditionPlan,
    concurrency_limit: usize,
    events: Option<Sender<ProcessEvent>>,
) -> Result<Manifest, ProcessError> {
    let total = sources.len();
    if total == 0 {
        return Ok(Manifest::new());
    }

    let threads = concurrency_limit.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("respimg-file-{i}"))
        .build()?;
    info!(files = total, workers = threads, renditions = plan.specs.len(), "dispatching");

    let (tx, rx) = mpsc::channel::<FileDone>();

    let slots = thread::scope(|scope| {
        let aggregator = scope.spawn(move || aggregate(rx, total, events));

        pool.scope_fifo(|fifo| {
            for (index, source) in sources.iter().enumerate() {
                debug!(source = %source.file_name(), state = ?FileState::Queued);
                let tx = tx.clone();
                fifo.spawn_fifo(move |_| {
                    let entry = guarded_file_task(codec, source, plan);
                    // A closed channel means the aggregator is gone; the
                    // missing slot is reported after the join below.
                    let _ = tx.send(FileDone {
                        index,
                        file_name: source.file_name(),
                        entry,
                    });
                });
            }
        });
        drop(tx);

        aggregator.join()
    })
    .map_err(|_| ProcessError::Aggregator)?;

    let mut manifest = Manifest::new();
    for (source, slot) in sources.iter().zip(slots) {
        let entry = slot.unwrap_or_else(|| {
            error!(source = %source.file_name(), "file task did not report a result");
            failed_entry(codec, source, plan, "file task did not complete")
        });
        manifest.push(source.base_name.clone(), entry);
    }
    Ok(manifest)
}

/// Run one file task, converting a panic into a failed entry.
fn guarded_file_task<C: ImageCodec>(
    codec: &C,
    source: &SourceImage,
    plan: &RenditionPlan,
) -> ManifestEntry {
    debug!(source = %source.file_name(), state = ?FileState::Running);
    let entry = panic::catch_unwind(AssertUnwindSafe(|| file_task(codec, source, plan)))
        .unwrap_or_else(|payload| {
            let reason = format!("file task panicked: {}", panic_message(payload.as_ref()));
            error!(source = %source.file_name(), "{reason}");
            failed_entry(codec, source, plan, &reason)
        });
    debug!(source = %source.file_name(), state = ?FileState::settled(&entry));
    entry
}

/// Decode once, render every rendition, then derive the placeholder from
/// the same decode.
fn file_task<C: ImageCodec>(codec: &C, source: &SourceImage, plan: &RenditionPlan) -> ManifestEntry {
    let transcoder = FileTranscoder::new(codec, plan);
    match transcoder.decode(source) {
        Ok(image) => {
            let variants = transcoder.render(source, &image);
            let lqip = LqipGenerator::new(codec).generate_from(source, &image);
            ManifestEntry {
                variants,
                lqip,
                decoded: true,
            }
        }
        Err(e) => failed_entry(codec, source, plan, &e.to_string()),
    }
}

fn failed_entry<C: ImageCodec>(
    codec: &C,
    source: &SourceImage,
    plan: &RenditionPlan,
    reason: &str,
) -> ManifestEntry {
    ManifestEntry {
        variants: FileTranscoder::new(codec, plan).fail_all(source, reason),
        lqip: lqip::unavailable(source),
        decoded: false,
    }
}

/// Sole owner of the results. Fills slots by discovery index until every
/// sender is dropped.
fn aggregate(
    rx: Receiver<FileDone>,
    total: usize,
    events: Option<Sender<ProcessEvent>>,
) -> Vec<Option<ManifestEntry>> {
    let mut slots: Vec<Option<ManifestEntry>> = vec![None; total];
    for done in rx {
        if let Some(events) = &events {
            let _ = events.send(completed_event(&done, total));
        }
        slots[done.index] = Some(done.entry);
    }
    slots
}

fn completed_event(done: &FileDone, total: usize) -> ProcessEvent {
    ProcessEvent::FileCompleted {
        index: done.index + 1,
        total,
        key: done.entry.lqip.source_key.clone(),
        file_name: done.file_name.clone(),
        variants: done
            .entry
            .variants
            .iter()
            .map(|v| VariantInfo {
                label: format!("{}w.{}", v.width, v.format),
                status: match &v.status {
                    RenditionStatus::Ok => VariantStatus::Written,
                    RenditionStatus::Failed { reason } => VariantStatus::Failed(reason.clone()),
                },
            })
            .collect(),
        placeholder: done.entry.lqip.placeholder.is_some(),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
