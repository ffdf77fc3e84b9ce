//! Attachment normalization.
//!
//! Accepts JPEG, PNG, GIF, WebP and BMP. JPEG input passes through untouched
//! once it decodes; everything else is flattened onto opaque white and
//! re-encoded as JPEG. Identical input and quality give identical output.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use super::errors::MediaError;

/// Ceiling for images attached to a broadcast.
pub const BROADCAST_MAX_BYTES: usize = 25 * 1024 * 1024;

/// Ceiling for images attached through the single-message composer.
pub const MESSAGE_MAX_BYTES: usize = 8 * 1024 * 1024;

/// JPEG quality factor (0.85).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Per-flow size ceilings and encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaLimits {
    pub broadcast_max_bytes: usize,
    pub message_max_bytes: usize,
    pub jpeg_quality: u8,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            broadcast_max_bytes: BROADCAST_MAX_BYTES,
            message_max_bytes: MESSAGE_MAX_BYTES,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Which composition flow an attachment arrives through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFlow {
    Broadcast,
    Message,
}

impl MediaLimits {
    pub fn max_bytes(&self, flow: UploadFlow) -> usize {
        match flow {
            UploadFlow::Broadcast => self.broadcast_max_bytes,
            UploadFlow::Message => self.message_max_bytes,
        }
    }
}

/// Accepted input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
}

impl SourceFormat {
    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::WebP => Some(Self::WebP),
            ImageFormat::Bmp => Some(Self::Bmp),
            _ => None,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
            Self::WebP => ImageFormat::WebP,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}

/// An opaque JPEG ready to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub source_format: SourceFormat,
}

impl NormalizedImage {
    pub fn content_type(&self) -> &'static str {
        "image/jpeg"
    }

    pub fn file_name(&self) -> &'static str {
        "attachment.jpg"
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Normalize with the default quality factor.
pub fn normalize(raw: &[u8], max_bytes: usize) -> Result<NormalizedImage, MediaError> {
    normalize_with_quality(raw, max_bytes, DEFAULT_JPEG_QUALITY)
}

pub fn normalize_with_quality(
    raw: &[u8],
    max_bytes: usize,
    quality: u8,
) -> Result<NormalizedImage, MediaError> {
    let format = image::guess_format(raw)
        .ok()
        .and_then(SourceFormat::from_image_format)
        .ok_or(MediaError::UnsupportedFormat)?;

    if raw.len() > max_bytes {
        return Err(MediaError::TooLarge {
            size: raw.len(),
            max: max_bytes,
        });
    }

    let decoded = image::load_from_memory_with_format(raw, format.image_format())
        .map_err(|e| MediaError::Decode(e.to_string()))?;

    if format == SourceFormat::Jpeg {
        return Ok(NormalizedImage {
            bytes: raw.to_vec(),
            width: decoded.width(),
            height: decoded.height(),
            source_format: format,
        });
    }

    let flattened = flatten_onto_white(&decoded);
    let mut bytes = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        encoder
            .encode_image(&flattened)
            .map_err(|e| MediaError::Encode(e.to_string()))?;
    }

    if bytes.len() > max_bytes {
        return Err(MediaError::TooLarge {
            size: bytes.len(),
            max: max_bytes,
        });
    }

    Ok(NormalizedImage {
        bytes,
        width: flattened.width(),
        height: flattened.height(),
        source_format: format,
    })
}

/// Composite onto an opaque white background.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
    })
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (u32::from(channel), u32::from(alpha));
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}
