//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Each source leads with its positional index and manifest key; the file on
//! disk and per-rendition status follow as indented context lines. Files are
//! printed as they complete, so indices can appear out of order when several
//! files run at once.
//!
//! ```text
//! 001 beach
//!     Source: beach.png
//!     600w.jpg: written
//!     600w.avif: failed (unsupported: no avif encoder)
//!     lqip: ok
//! 002 photo
//!     Source: photo.jpg
//!     ...
//!
//! Wrote web/imageData.json
//! 2 sources, 7 renditions written, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each `format_*` function returns `Vec<String>` for testability and has a
//! `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::pipeline::RunReport;
use crate::process::{ProcessEvent, VariantStatus};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format one completed file as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::FileCompleted {
            index,
            key,
            file_name,
            variants,
            placeholder,
            ..
        } => {
            let mut lines = Vec::with_capacity(variants.len() + 3);
            lines.push(format!("{} {}", format_index(*index), key));
            lines.push(format!("{}Source: {}", indent(1), file_name));
            for variant in variants {
                let status = match &variant.status {
                    VariantStatus::Written => "written".to_string(),
                    VariantStatus::Failed(reason) => format!("failed ({reason})"),
                };
                lines.push(format!("{}{}: {}", indent(1), variant.label, status));
            }
            let lqip = if *placeholder { "ok" } else { "missing" };
            lines.push(format!("{}lqip: {}", indent(1), lqip));
            lines
        }
    }
}

pub fn print_process_event(event: &ProcessEvent) {
    for line in format_process_event(event) {
        println!("{}", line);
    }
}

/// Format the end-of-run summary.
pub fn format_summary(report: &RunReport) -> Vec<String> {
    vec![
        String::new(),
        format!("Wrote {}", report.manifest_path.display()),
        report.summary.to_string(),
    ]
}

pub fn print_summary(report: &RunReport) {
    for line in format_summary(report) {
        println!("{}", line);
    }
}
