//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::Side;

/// Whether an image already fits inside a `target`×`target` box.
///
/// Such images are served as their own thumbnail.
pub fn fits_within(dims: Dimensions, target: u32) -> bool {
    dims.width <= target && dims.height <= target
}

/// Choose which side is fixed when scaling to `target` on the longer edge.
///
/// Landscape images fix the width; portrait and square images fix the height.
///
/// ```
/// # use album_server::imaging::{Dimensions, Side, calculations::fit_sides};
/// let landscape = Dimensions { width: 800, height: 600 };
/// assert_eq!(fit_sides(landscape, 150), (Side::Px(150), Side::Auto));
///
/// let portrait = Dimensions { width: 600, height: 800 };
/// assert_eq!(fit_sides(portrait, 150), (Side::Auto, Side::Px(150)));
/// ```
pub fn fit_sides(dims: Dimensions, target: u32) -> (Side, Side) {
    if dims.width > dims.height {
        (Side::Px(target), Side::Auto)
    } else {
        (Side::Auto, Side::Px(target))
    }
}

/// Resolve a `(width, height)` request against the source dimensions.
///
/// An `Auto` side is derived from the fixed side, preserving aspect ratio
/// and rounding to the nearest pixel (never below 1). Returns `None` when
/// both sides are `Auto` or the source is degenerate.
pub fn resolve_sides(source: Dimensions, width: Side, height: Side) -> Option<(u32, u32)> {
    if source.width == 0 || source.height == 0 {
        return None;
    }
    let (src_w, src_h) = (source.width as f64, source.height as f64);

    match (width, height) {
        (Side::Px(w), Side::Px(h)) => Some((w, h)),
        (Side::Px(w), Side::Auto) => {
            let h = (src_h * w as f64 / src_w).round() as u32;
            Some((w, h.max(1)))
        }
        (Side::Auto, Side::Px(h)) => {
            let w = (src_w * h as f64 / src_h).round() as u32;
            Some((w.max(1), h))
        }
        (Side::Auto, Side::Auto) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// What a backend produces for a scale-to-fit: the longer side becomes `target`.
    fn scale_to_fit(source: Dimensions, target: u32) -> Option<(u32, u32)> {
        let (width, height) = fit_sides(source, target);
        resolve_sides(source, width, height)
    }

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    // =========================================================================
    // fits_within
    // =========================================================================

    #[test]
    fn fits_when_both_sides_within_target() {
        assert!(fits_within(dims(50, 40), 50));
        assert!(fits_within(dims(150, 150), 150));
    }

    #[test]
    fn does_not_fit_when_either_side_exceeds() {
        assert!(!fits_within(dims(51, 10), 50));
        assert!(!fits_within(dims(10, 51), 50));
    }

    // =========================================================================
    // fit_sides
    // =========================================================================

    #[test]
    fn square_fixes_height() {
        assert_eq!(fit_sides(dims(300, 300), 50), (Side::Auto, Side::Px(50)));
    }

    // =========================================================================
    // resolve_sides / scale_to_fit
    // =========================================================================

    #[test]
    fn landscape_800x600_to_150() {
        // 600 * 150 / 800 = 112.5 → 113
        assert_eq!(scale_to_fit(dims(800, 600), 150), Some((150, 113)));
    }

    #[test]
    fn portrait_600x800_to_250() {
        // 600 * 250 / 800 = 187.5 → 188
        assert_eq!(scale_to_fit(dims(600, 800), 250), Some((188, 250)));
    }

    #[test]
    fn extreme_panorama_keeps_at_least_one_pixel() {
        assert_eq!(scale_to_fit(dims(10_000, 10), 50), Some((50, 1)));
    }

    #[test]
    fn both_auto_is_unresolvable() {
        assert_eq!(resolve_sides(dims(100, 100), Side::Auto, Side::Auto), None);
    }

    #[test]
    fn zero_sized_source_is_unresolvable() {
        assert_eq!(resolve_sides(dims(0, 100), Side::Px(10), Side::Auto), None);
    }

    #[test]
    fn explicit_sides_pass_through() {
        assert_eq!(
            resolve_sides(dims(100, 100), Side::Px(30), Side::Px(20)),
            Some((30, 20))
        );
    }

    #[test]
    fn aspect_ratio_preserved_within_one_pixel() {
        for &(w, h) in &[(800, 600), (1920, 1080), (333, 777), (4000, 3000)] {
            for &target in &[50, 150, 250] {
                let (out_w, out_h) = scale_to_fit(dims(w, h), target).unwrap();
                assert_eq!(out_w.max(out_h), target);
                let expected = if w > h {
                    h as f64 * out_w as f64 / w as f64
                } else {
                    w as f64 * out_h as f64 / h as f64
                };
                let actual = out_w.min(out_h) as f64;
                assert!((actual - expected).abs() <= 1.0, "{w}x{h} → {out_w}x{out_h}");
            }
        }
    }
}
