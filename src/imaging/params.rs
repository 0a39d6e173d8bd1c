//! Encode parameters shared by every rendition of a run.

/// Quality setting for lossy image encoding (1-100).
///
/// Lossless encoders (PNG, TIFF, GIF, and WebP in the pure-Rust codec)
/// ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality as the `u8` most encoders take.
    pub fn as_u8(self) -> u8 {
        self.0 as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}
