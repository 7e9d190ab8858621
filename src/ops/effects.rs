// ============================================================================
// EFFECTS — blur and sharpen, recomputed from the source every call
// ============================================================================
//
// Like the color grade, neither effect is cumulative: the caller always
// passes the untouched source, and a zero parameter returns it unchanged.
// ============================================================================

use rayon::prelude::*;

use crate::canvas::{CHANNELS, PixelBuffer};
use crate::ops::filters::gaussian_blur;

/// Upper bound for the blur radius and sharpen amount.
pub const MAX_EFFECT_PARAM: f32 = 50.0;

/// Gaussian sigma per unit of blur radius.
const BLUR_SIGMA_PER_RADIUS: f32 = 0.25;
/// Sigma of the blur an unsharp mask subtracts.
const SHARPEN_SIGMA: f32 = 1.0;
/// Sharpen amount that yields a mask strength of 1.0.
const SHARPEN_AMOUNT_PER_STRENGTH: f32 = 25.0;

/// Clamp an effect parameter into [0, MAX_EFFECT_PARAM]; NaN becomes 0.
fn sanitize(v: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, MAX_EFFECT_PARAM)
}

// --- Blur ---

/// Gaussian blur of `source` with `sigma = radius / 4`. Alpha is blurred too,
/// so soft edges appear around transparent regions.
pub fn apply_blur(source: &PixelBuffer, radius: f32) -> PixelBuffer {
    let radius = sanitize(radius);
    if radius == 0.0 {
        return source.clone();
    }
    gaussian_blur(source, radius * BLUR_SIGMA_PER_RADIUS)
}

// --- Sharpen (unsharp mask) ---

/// `out = s + strength * (s - blurred)` on RGB with `strength = amount / 25`.
/// Alpha is preserved.
pub fn apply_sharpness(source: &PixelBuffer, amount: f32) -> PixelBuffer {
    let amount = sanitize(amount);
    if amount == 0.0 || source.is_empty() {
        return source.clone();
    }
    let strength = amount / SHARPEN_AMOUNT_PER_STRENGTH;

    let blurred = gaussian_blur(source, SHARPEN_SIGMA);
    let stride = source.stride();
    let src_raw = source.as_raw();
    let blur_raw = blurred.as_raw();
    let mut out = PixelBuffer::new(source.width(), source.height());

    out.as_raw_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            let base = y * stride;
            for pi in (0..stride).step_by(CHANNELS) {
                let si = base + pi;
                for c in 0..3 {
                    let s = src_raw[si + c] as f32;
                    let b = blur_raw[si + c] as f32;
                    let v = s + strength * (s - b);
                    row_out[pi + c] = v.round().clamp(0.0, 255.0) as u8;
                }
                row_out[pi + 3] = src_raw[si + 3];
            }
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(w: u32, h: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = if (x + y) % 2 == 0 { 200 } else { 50 };
                buf.put_pixel(x, y, Rgba([v, v / 2, 255 - v, 255]));
            }
        }
        buf
    }

    #[test]
    fn zero_parameters_are_identity() {
        let src = checker(8, 6);
        assert_eq!(apply_blur(&src, 0.0), src);
        assert_eq!(apply_sharpness(&src, 0.0), src);
    }

    #[test]
    fn negative_and_nan_are_identity() {
        let src = checker(4, 4);
        assert_eq!(apply_blur(&src, -3.0), src);
        assert_eq!(apply_blur(&src, f32::NAN), src);
        assert_eq!(apply_sharpness(&src, -10.0), src);
    }

    #[test]
    fn blur_reduces_local_contrast() {
        let src = checker(10, 10);
        let out = apply_blur(&src, 8.0);
        let a = out.get_pixel(4, 4).unwrap()[0] as i32;
        let b = out.get_pixel(5, 4).unwrap()[0] as i32;
        assert!((a - b).abs() < 150);
    }

    #[test]
    fn sharpen_increases_local_contrast_and_keeps_alpha() {
        let mut src = PixelBuffer::filled(9, 9, [100, 100, 100, 180]);
        src.put_pixel(4, 4, Rgba([150, 150, 150, 180]));
        let out = apply_sharpness(&src, 50.0);
        assert!(out.get_pixel(4, 4).unwrap()[0] > 150);
        assert!(out.get_pixel(3, 4).unwrap()[0] < 100);
        assert!(out.as_raw().chunks(4).all(|p| p[3] == 180));
    }

    #[test]
    fn recompute_is_not_cumulative() {
        let src = checker(6, 6);
        let once = apply_blur(&src, 10.0);
        let again = apply_blur(&src, 10.0);
        assert_eq!(once, again);
    }

    #[test]
    fn oversized_radius_is_clamped() {
        let src = checker(5, 5);
        assert_eq!(apply_blur(&src, 5000.0), apply_blur(&src, MAX_EFFECT_PARAM));
    }

    #[test]
    fn sharpen_leaves_edges_of_erased_areas_alone() {
        let mut src = PixelBuffer::new(10, 4);
        for y in 0..4 {
            for x in 5..10 {
                src.put_pixel(x, y, Rgba([200, 200, 200, 255]));
            }
        }
        let out = apply_sharpness(&src, 50.0);
        for x in 5..10 {
            assert_eq!(out.get_pixel(x, 2), Some(Rgba([200, 200, 200, 255])));
        }
        assert_eq!(out.get_pixel(2, 2), Some(Rgba([0, 0, 0, 0])));
    }
}
