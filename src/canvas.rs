// ============================================================================
// PIXEL BUFFER — raw RGBA raster shared by every engine operation
// ============================================================================

use image::{Rgba, RgbaImage};

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// Owned RGBA8 raster.
///
/// `data.len() == width * height * 4` holds for every value of this type:
/// the fields are private and every constructor checks the length, so a
/// resize is always a new buffer built with both dimensions and data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    /// Buffer with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&color);
        }
        Self { width, height, data }
    }

    /// Wrap raw RGBA bytes. Returns `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != byte_len(width, height) {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn from_rgba_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        // Length is guaranteed by construction, the fallback is unreachable.
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the pixel bytes. The slice cannot change length,
    /// so the size invariant survives.
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Pixel at (x, y), or `None` outside the buffer.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some(Rgba([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]))
    }

    /// Write a pixel; writes outside the buffer are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, px: Rgba<u8>) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + CHANNELS].copy_from_slice(&px.0);
    }

    /// Heap size of the pixel data.
    pub fn memory_bytes(&self) -> usize {
        self.data.len()
    }
}

#[inline]
fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}
