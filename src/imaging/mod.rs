//! Image codec layer, pure Rust with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` crate; AVIF via `avif-parse` + `rav1d` |
//! | **Resize** | `resize_exact` with Lanczos3 (aspect preserved by calculation) |
//! | **Encode** | JPEG/AVIF with quality, PNG/WebP/GIF/TIFF lossless |
//! | **Placeholder** | 16px-wide PNG |
//!
//! The module is split into:
//! - **Codec**: [`ImageCodec`] trait, the only thing the pipeline depends on
//! - **Calculations**: pure dimension math (unit testable)
//! - **Parameters**: [`Quality`]
//! - **RustCodec**: the production implementation

mod avif;
mod calculations;
pub mod codec;
mod params;
pub mod rust_codec;

pub use codec::{CodecError, Dimensions, EncodedPlaceholder, ImageCodec};
pub use params::Quality;
pub use rust_codec::RustCodec;
