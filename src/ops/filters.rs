// ============================================================================
// CONVOLUTION KERNELS — separable Gaussian blur shared by blur and sharpen
// ============================================================================

use rayon::prelude::*;

use crate::canvas::{CHANNELS, PixelBuffer};

/// Normalised 1-D Gaussian kernel with half-width `ceil(3 * sigma)`.
pub(crate) fn build_gaussian_kernel(sigma: f32) -> Vec<f32> {
    if sigma.is_nan() || sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (sigma * 3.0).ceil() as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let len = radius * 2 + 1;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..len)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();
    let inv = 1.0 / kernel.iter().sum::<f32>();
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

/// Rayon-parallelised separable Gaussian blur over all four channels.
/// Colour is convolved premultiplied by alpha, so fully transparent pixels
/// (erased areas are `(0,0,0,0)`) contribute no colour to their neighbours.
/// Samples past the edge are clamped to the nearest edge pixel.
pub(crate) fn gaussian_blur(src: &PixelBuffer, sigma: f32) -> PixelBuffer {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let kernel = build_gaussian_kernel(sigma);
    if kernel.len() == 1 {
        return src.clone();
    }
    let radius = (kernel.len() / 2) as isize;
    let stride = w * CHANNELS;
    let src_raw = src.as_raw();

    // --- Premultiply ---
    let mut premul = vec![0.0f32; stride * h];
    premul.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for (px_in, px_out) in row_in.chunks_exact(CHANNELS).zip(row_out.chunks_exact_mut(CHANNELS)) {
            let a = px_in[3] as f32 / 255.0;
            px_out[0] = px_in[0] as f32 * a;
            px_out[1] = px_in[1] as f32 * a;
            px_out[2] = px_in[2] as f32 * a;
            px_out[3] = px_in[3] as f32;
        }
    });

    // --- Horizontal pass ---
    let mut buf_h = vec![0.0f32; stride * h];
    buf_h.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &premul[y * stride..(y + 1) * stride];
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = (x as isize + ki as isize - radius).clamp(0, w as isize - 1) as usize;
                let si = sx * CHANNELS;
                for c in 0..CHANNELS {
                    acc[c] += row_in[si + c] * kv;
                }
            }
            row_out[x * CHANNELS..x * CHANNELS + CHANNELS].copy_from_slice(&acc);
        }
    });

    // --- Vertical pass, un-premultiply straight to bytes ---
    let mut out = PixelBuffer::new(src.width(), src.height());
    out.as_raw_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sy = (y as isize + ki as isize - radius).clamp(0, h as isize - 1) as usize;
                    let si = sy * stride + x * CHANNELS;
                    for c in 0..CHANNELS {
                        acc[c] += buf_h[si + c] * kv;
                    }
                }
                let oi = x * CHANNELS;
                let alpha = acc[3].round().clamp(0.0, 255.0);
                if alpha == 0.0 {
                    row_out[oi..oi + CHANNELS].copy_from_slice(&[0, 0, 0, 0]);
                    continue;
                }
                let unmul = 255.0 / acc[3];
                for c in 0..3 {
                    row_out[oi + c] = (acc[c] * unmul).round().clamp(0.0, 255.0) as u8;
                }
                row_out[oi + 3] = alpha as u8;
            }
        });

    out
}
