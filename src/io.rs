// ============================================================================
// CODEC I/O — asynchronous decode / encode of raster formats
// ============================================================================
//
// Decoding and encoding run on the rayon pool; the result comes back through
// a oneshot channel, so the returned futures can be driven by any executor
// (the CLI and the tests use `pollster::block_on`).
// ============================================================================

use std::future::Future;
use std::io::Cursor;

use futures::channel::oneshot;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageError};

use crate::canvas::PixelBuffer;

/// Maximum supported image dimension in pixels (per axis).
/// Prevents memory exhaustion from crafted files.
pub const MAX_IMAGE_DIM: u32 = 32_768;

/// Default JPEG quality.
pub const DEFAULT_QUALITY: u8 = 92;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("input is empty")]
    Empty,

    #[error("unsupported or malformed image: {0}")]
    Image(#[from] ImageError),

    #[error("image is {width}x{height}, larger than the 32768px limit")]
    TooLarge { width: u32, height: u32 },

    #[error("decode task was dropped before finishing")]
    Interrupted,
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("no image is loaded")]
    NoImage,

    #[error("encoding failed: {0}")]
    Image(#[from] ImageError),

    #[error("encode task was dropped before finishing")]
    Interrupted,
}

// ============================================================================
// EXPORT FORMAT
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tga,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Bmp => "bmp",
            ExportFormat::Tga => "tga",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Bmp => "image/bmp",
            ExportFormat::Tga => "image/x-tga",
        }
    }

    pub fn supports_quality(&self) -> bool {
        matches!(self, ExportFormat::Jpeg)
    }

    /// Parse a format name, file extension or MIME type
    /// (`"png"`, `"JPG"`, `"image/jpeg"`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        let name = s.strip_prefix("image/").unwrap_or(&s);
        match name {
            "png" => Some(ExportFormat::Png),
            "jpeg" | "jpg" => Some(ExportFormat::Jpeg),
            "bmp" => Some(ExportFormat::Bmp),
            "tga" | "x-tga" => Some(ExportFormat::Tga),
            _ => None,
        }
    }
}

// ============================================================================
// SYNCHRONOUS CORE
// ============================================================================

/// Decode any format the `image` crate understands into an RGBA buffer.
pub fn decode_sync(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let img = image::load_from_memory(bytes)?;
    let (width, height) = (img.width(), img.height());
    if width > MAX_IMAGE_DIM || height > MAX_IMAGE_DIM {
        return Err(DecodeError::TooLarge { width, height });
    }
    Ok(PixelBuffer::from_rgba_image(img.into_rgba8()))
}

/// Encode a buffer. `quality` (1-100) only affects JPEG, which also drops
/// the alpha channel.
pub fn encode_sync(buffer: &PixelBuffer, format: ExportFormat, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let (w, h) = buffer.dimensions();
    let mut out = Cursor::new(Vec::new());

    match format {
        ExportFormat::Png => {
            PngEncoder::new(&mut out).write_image(buffer.as_raw(), w, h, ColorType::Rgba8)?;
        }
        ExportFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(buffer.to_rgba_image()).to_rgb8();
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).write_image(
                rgb.as_raw(),
                w,
                h,
                ColorType::Rgb8,
            )?;
        }
        ExportFormat::Bmp => {
            BmpEncoder::new(&mut out).write_image(buffer.as_raw(), w, h, ColorType::Rgba8)?;
        }
        ExportFormat::Tga => {
            TgaEncoder::new(&mut out).write_image(buffer.as_raw(), w, h, ColorType::Rgba8)?;
        }
    }

    Ok(out.into_inner())
}

// ============================================================================
// ASYNC WRAPPERS
// ============================================================================

/// Decode on the rayon pool.
pub fn decode(bytes: Vec<u8>) -> impl Future<Output = Result<PixelBuffer, DecodeError>> {
    let (tx, rx) = oneshot::channel();
    rayon::spawn(move || {
        let _ = tx.send(decode_sync(&bytes));
    });
    async move { rx.await.unwrap_or(Err(DecodeError::Interrupted)) }
}

/// Encode on the rayon pool. The buffer is moved into the task.
pub fn encode(
    buffer: PixelBuffer,
    format: ExportFormat,
    quality: u8,
) -> impl Future<Output = Result<Vec<u8>, EncodeError>> {
    let (tx, rx) = oneshot::channel();
    rayon::spawn(move || {
        let _ = tx.send(encode_sync(&buffer, format, quality));
    });
    async move { rx.await.unwrap_or(Err(EncodeError::Interrupted)) }
}
