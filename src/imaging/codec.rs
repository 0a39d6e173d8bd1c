//! Codec trait and shared types.
//!
//! [`ImageCodec`] is everything the pipeline needs from an image library:
//! decode bytes once, produce a resized re-encode of that decode for a
//! (width, format, quality), and produce a tiny placeholder encoding.
//!
//! The decoded representation is an associated type so the pipeline can
//! share one decode by reference across rendition workers without knowing
//! what it is. The production implementation is
//! [`RustCodec`](super::rust_codec::RustCodec).

use super::params::Quality;
use crate::types::OutputFormat;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Output of [`ImageCodec::placeholder`]: encoded bytes plus what a data
/// URI needs to describe them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPlaceholder {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Decode, resize + re-encode, and placeholder generation.
///
/// Implementations must be `Sync`: one codec instance serves every file task
/// and every rendition worker concurrently.
pub trait ImageCodec: Sync {
    /// Immutable decoded image, shared read-only across rendition workers.
    type Image: Send + Sync;

    /// Decode an image from its encoded bytes.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image, CodecError>;

    /// Dimensions of a decoded image.
    fn dimensions(&self, image: &Self::Image) -> Dimensions;

    /// Scale `image` to `width` (height follows the aspect ratio) and encode
    /// it as `format`.
    fn encode(
        &self,
        image: &Self::Image,
        width: u32,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError>;

    /// Encode a tiny preview no wider than `max_width`.
    fn placeholder(
        &self,
        image: &Self::Image,
        max_width: u32,
    ) -> Result<EncodedPlaceholder, CodecError>;
}
