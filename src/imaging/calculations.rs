//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::codec::Dimensions;

/// Height that keeps the source aspect ratio at `target_width`.
///
/// Never returns 0: a very wide source scaled to a small width still gets a
/// one-pixel row.
///
/// ```text
/// (4000, 3000) at 600  → 450
/// (3000, 4000) at 600  → 800
/// (10000, 10)  at 100  → 1
/// ```
pub fn scaled_height(source: Dimensions, target_width: u32) -> u32 {
    if source.width == 0 {
        return 1;
    }
    let h = (target_width as f64 * source.height as f64 / source.width as f64).round() as u32;
    h.max(1)
}

/// Placeholder size: `max_width` wide (never wider than the source), aspect
/// preserved.
pub fn placeholder_dimensions(source: Dimensions, max_width: u32) -> Dimensions {
    let width = max_width.min(source.width).max(1);
    Dimensions {
        width,
        height: scaled_height(source, width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn scaled_height_landscape() {
        assert_eq!(scaled_height(dims(4000, 3000), 600), 450);
    }

    #[test]
    fn scaled_height_portrait() {
        assert_eq!(scaled_height(dims(3000, 4000), 600), 800);
    }

    #[test]
    fn scaled_height_upscales() {
        assert_eq!(scaled_height(dims(64, 48), 1200), 900);
    }

    #[test]
    fn scaled_height_rounds() {
        // 333 * 2/3 = 222
        assert_eq!(scaled_height(dims(300, 200), 333), 222);
        // 100 * 1/3 = 33.33 → 33
        assert_eq!(scaled_height(dims(300, 100), 100), 33);
    }

    #[test]
    fn scaled_height_never_zero() {
        assert_eq!(scaled_height(dims(10000, 10), 100), 1);
        assert_eq!(scaled_height(dims(0, 10), 100), 1);
    }

    #[test]
    fn placeholder_caps_at_max_width() {
        assert_eq!(placeholder_dimensions(dims(4000, 3000), 16), dims(16, 12));
    }

    #[test]
    fn placeholder_never_wider_than_source() {
        assert_eq!(placeholder_dimensions(dims(8, 8), 16), dims(8, 8));
    }
}
