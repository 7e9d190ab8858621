// ============================================================================
// CROP — rectangular extraction with bounds clamping
// ============================================================================

use crate::canvas::{CHANNELS, PixelBuffer};

/// A crop rectangle after clamping to the buffer bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Clamp `[x, x+width) × [y, y+height)` into the buffer. Negative or
/// oversized rectangles shrink; a fully outside rectangle becomes empty.
pub fn clamp_crop_rect(buffer: &PixelBuffer, x: i64, y: i64, width: i64, height: i64) -> CropRect {
    let (bw, bh) = (buffer.width() as i64, buffer.height() as i64);
    let x0 = x.clamp(0, bw);
    let y0 = y.clamp(0, bh);
    let x1 = x.saturating_add(width.max(0)).clamp(x0, bw);
    let y1 = y.saturating_add(height.max(0)).clamp(y0, bh);
    CropRect {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    }
}

/// Extract the clamped rectangle into a new buffer.
pub fn apply_crop(buffer: &PixelBuffer, x: i64, y: i64, width: i64, height: i64) -> PixelBuffer {
    let rect = clamp_crop_rect(buffer, x, y, width, height);
    crop_to_rect(buffer, rect)
}

fn crop_to_rect(buffer: &PixelBuffer, rect: CropRect) -> PixelBuffer {
    if rect.is_empty() {
        return PixelBuffer::new(0, 0);
    }
    if rect.x == 0 && rect.y == 0 && rect.width == buffer.width() && rect.height == buffer.height() {
        return buffer.clone();
    }

    let src = buffer.as_raw();
    let src_stride = buffer.stride();
    let row_bytes = rect.width as usize * CHANNELS;
    let mut data = Vec::with_capacity(row_bytes * rect.height as usize);
    for y in rect.y..rect.y + rect.height {
        let start = y as usize * src_stride + rect.x as usize * CHANNELS;
        data.extend_from_slice(&src[start..start + row_bytes]);
    }

    PixelBuffer::from_raw(rect.width, rect.height, data)
        .unwrap_or_else(|| PixelBuffer::new(0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn numbered(w: u32, h: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                buf.put_pixel(x, y, Rgba([x as u8, y as u8, 0, 255]));
            }
        }
        buf
    }

    #[test]
    fn full_rect_is_identity() {
        let buf = numbered(5, 4);
        assert_eq!(apply_crop(&buf, 0, 0, 5, 4), buf);
    }

    #[test]
    fn extracts_interior_rect() {
        let buf = numbered(6, 6);
        let out = apply_crop(&buf, 2, 1, 3, 2);
        assert_eq!(out.dimensions(), (3, 2));
        assert_eq!(out.get_pixel(0, 0), Some(Rgba([2, 1, 0, 255])));
        assert_eq!(out.get_pixel(2, 1), Some(Rgba([4, 2, 0, 255])));
    }

    #[test]
    fn oversized_rect_is_clamped() {
        let buf = numbered(5, 4);
        let out = apply_crop(&buf, -5, -5, 105, 104);
        assert!(out.width() <= 5 && out.height() <= 4);
        assert_eq!(out, buf);
    }

    #[test]
    fn negative_origin_shrinks_size() {
        let buf = numbered(5, 5);
        let rect = clamp_crop_rect(&buf, -2, -1, 4, 3);
        assert_eq!(rect, CropRect { x: 0, y: 0, width: 2, height: 2 });
    }

    #[test]
    fn outside_rect_is_empty() {
        let buf = numbered(5, 5);
        assert!(clamp_crop_rect(&buf, 10, 10, 3, 3).is_empty());
        assert!(clamp_crop_rect(&buf, 1, 1, -3, 2).is_empty());
        let out = apply_crop(&buf, 10, 0, 3, 3);
        assert_eq!(out.dimensions(), (0, 0));
        assert!(out.as_raw().is_empty());
    }

    #[test]
    fn huge_values_do_not_overflow() {
        let buf = numbered(3, 3);
        let out = apply_crop(&buf, i64::MAX, i64::MIN, i64::MAX, i64::MAX);
        assert!(out.width() <= 3 && out.height() <= 3);
    }
}
