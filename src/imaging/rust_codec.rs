//! Pure Rust codec with no system library dependencies.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image::load_from_memory_with_format` |
//! | Decode (AVIF) | `avif-parse` + `rav1d`, see [`avif`](super::avif) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | Encode → PNG, WebP, GIF, TIFF | `DynamicImage::write_to` (lossless; quality ignored) |
//! | Placeholder | `resize_exact` with `Triangle` + PNG |
//!
//! SVG and other formats without a decoder fail at decode time, which the
//! transcoder records against every rendition of that source.

use super::avif::decode_avif;
use super::calculations::{placeholder_dimensions, scaled_height};
use super::codec::{CodecError, Dimensions, EncodedPlaceholder, ImageCodec};
use super::params::Quality;
use crate::types::OutputFormat;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// rav1e speed preset: 1 (slowest, smallest) to 10 (fastest).
const AVIF_SPEED: u8 = 6;

/// Production codec on the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop to 8 bits per channel, keeping alpha only when present.
/// The JPEG, AVIF, WebP and GIF encoders only accept 8-bit input.
fn to_8bit(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

/// ISO-BMFF `ftyp` box with an AVIF brand (`avif` still, `avis` sequence).
/// An `ftyp` box naming an AVIF brand, either as the major brand or among
/// the compatible brands that follow the minor version.
fn is_avif(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    let box_size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let end = box_size.min(bytes.len());
    let is_avif_brand = |brand: &[u8]| matches!(brand, b"avif" | b"avis");
    is_avif_brand(&bytes[8..12])
        || bytes
            .get(16..end)
            .is_some_and(|brands| brands.chunks_exact(4).any(is_avif_brand))
}

fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.as_u8())),
        OutputFormat::Avif => to_8bit(img).write_with_encoder(
            AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, quality.as_u8()),
        ),
        OutputFormat::WebP => to_8bit(img).write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP),
        OutputFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif),
        OutputFormat::Png => img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png),
        OutputFormat::Tiff => img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Tiff),
    };
    result.map_err(|e| CodecError::Encode(format!("{format}: {e}")))?;
    Ok(buf)
}

impl ImageCodec for RustCodec {
    type Image = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        if is_avif(bytes) {
            return decode_avif(bytes);
        }
        let format = image::guess_format(bytes)
            .map_err(|_| CodecError::Decode("unrecognized image data".into()))?;
        match format {
            // reading_enabled() reports true for AVIF with only the encoder compiled in
            ImageFormat::Avif => decode_avif(bytes),
            f if f.reading_enabled() => image::load_from_memory_with_format(bytes, f)
                .map_err(|e| CodecError::Decode(e.to_string())),
            f => Err(CodecError::Unsupported(format!("no decoder for {f:?}"))),
        }
    }

    fn dimensions(&self, image: &DynamicImage) -> Dimensions {
        Dimensions {
            width: image.width(),
            height: image.height(),
        }
    }

    fn encode(
        &self,
        image: &DynamicImage,
        width: u32,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        let height = scaled_height(self.dimensions(image), width);
        let resized = image.resize_exact(width, height, FilterType::Lanczos3);
        encode_image(&resized, format, quality)
    }

    fn placeholder(
        &self,
        image: &DynamicImage,
        max_width: u32,
    ) -> Result<EncodedPlaceholder, CodecError> {
        let Dimensions { width, height } = placeholder_dimensions(self.dimensions(image), max_width);
        let tiny = to_8bit(&image.resize_exact(width, height, FilterType::Triangle));
        let bytes = encode_image(&tiny, OutputFormat::Png, Quality::default())?;
        Ok(EncodedPlaceholder {
            bytes,
            mime: "image/png",
            width,
            height,
        })
    }
}
