//! Low-quality image placeholders.
//!
//! One per source: a 16px-wide PNG of the image, base64-encoded into a
//! `data:` URI that a page can inline while the real renditions load.
//!
//! Generation never fails a run. Any read, decode or encode error, or a
//! panic inside the codec, is logged and the result carries no placeholder.

use crate::imaging::{EncodedPlaceholder, ImageCodec};
use crate::process::panic_message;
use crate::types::{LqipResult, Placeholder, SourceImage};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Placeholder width in pixels. Height follows the aspect ratio.
pub const LQIP_WIDTH: u32 = 16;

pub struct LqipGenerator<'a, C: ImageCodec> {
    codec: &'a C,
}

impl<'a, C: ImageCodec> LqipGenerator<'a, C> {
    pub fn new(codec: &'a C) -> Self {
        Self { codec }
    }

    /// Read and decode `source`, then build its placeholder.
    pub fn generate(&self, source: &SourceImage) -> LqipResult {
        let decoded = std::fs::read(&source.path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| self.codec.decode(&bytes).map_err(|e| e.to_string()));
        match decoded {
            Ok(image) => self.generate_from(source, &image),
            Err(reason) => missing(source, &reason),
        }
    }

    /// Build the placeholder from an image that is already decoded.
    ///
    /// The renditions of `source` are already on disk by the time this
    /// runs, so a codec panic here is contained and only drops the
    /// placeholder.
    pub fn generate_from(&self, source: &SourceImage, image: &C::Image) -> LqipResult {
        let encoded =
            panic::catch_unwind(AssertUnwindSafe(|| self.codec.placeholder(image, LQIP_WIDTH)));
        match encoded {
            Ok(Ok(encoded)) => LqipResult {
                source_key: source.base_name.clone(),
                placeholder: Some(to_placeholder(&encoded)),
            },
            Ok(Err(e)) => missing(source, &e.to_string()),
            Err(payload) => missing(
                source,
                &format!("encoder panicked: {}", panic_message(payload.as_ref())),
            ),
        }
    }
}

/// The result for a source whose image could not be decoded at all.
pub fn unavailable(source: &SourceImage) -> LqipResult {
    LqipResult {
        source_key: source.base_name.clone(),
        placeholder: None,
    }
}

fn missing(source: &SourceImage, reason: &str) -> LqipResult {
    warn!(source = %source.file_name(), "placeholder unavailable: {reason}");
    unavailable(source)
}

fn to_placeholder(encoded: &EncodedPlaceholder) -> Placeholder {
    Placeholder {
        data_uri: data_uri(encoded.mime, &encoded.bytes),
        width: encoded.width,
        height: encoded.height,
    }
}

/// `data:<mime>;base64,<payload>`
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
