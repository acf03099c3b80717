//! Raster encoding and pictures-library persistence
//!
//! Encodes a normalized BGRA frame with the `image` crate and persists it
//! under the configured pictures directory before upload. Name collisions
//! are resolved by auto-generating a unique name.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgba};

use super::{FrameBuffer, PixelFormat};
use crate::{Error, Result};

/// Raster formats supported for the captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG (default)
    Png,
    /// JPEG (alpha dropped)
    Jpeg,
    /// BMP
    Bmp,
    /// TIFF
    Tiff,
    /// GIF
    Gif,
}

impl ImageFormat {
    /// Canonical file extension
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
        }
    }

    const fn as_image(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Tiff => image::ImageFormat::Tiff,
            Self::Gif => image::ImageFormat::Gif,
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            "tiff" | "tif" => Ok(Self::Tiff),
            "gif" => Ok(Self::Gif),
            other => Err(Error::Config(format!("unknown image format: {other}"))),
        }
    }
}

/// An encoded frame ready for persistence and upload
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// The raster format of `bytes`
    pub format: ImageFormat,
    /// Encoded file contents
    pub bytes: Vec<u8>,
}

/// Encode a normalized BGRA frame to `format`
///
/// # Errors
///
/// Returns [`Error::Encode`] if the frame is not BGRA8, the buffer is
/// undersized, or the codec fails.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(frame: &FrameBuffer, format: ImageFormat) -> Result<EncodedImage> {
    if frame.format != PixelFormat::Bgra8 {
        return Err(Error::Encode(format!(
            "expected BGRA8 input, got {:?}",
            frame.format
        )));
    }

    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.data.len() < expected {
        return Err(Error::Encode(format!(
            "buffer too small: expected {expected} bytes, got {}",
            frame.data.len()
        )));
    }

    // The image crate has no BGRA layout; swap to RGBA first.
    let mut rgba = Vec::with_capacity(frame.data.len());
    for px in frame.data.chunks_exact(4) {
        rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
    }

    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(frame.width, frame.height, rgba)
            .ok_or_else(|| Error::Encode("failed to assemble image buffer".to_string()))?;

    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    let result = if format == ImageFormat::Jpeg {
        // JPEG has no alpha channel
        image::DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .write_to(&mut cursor, format.as_image())
    } else {
        img.write_to(&mut cursor, format.as_image())
    };
    result.map_err(|e| Error::Encode(e.to_string()))?;

    Ok(EncodedImage { format, bytes })
}

/// Persist an encoded image under `dir` with collision-free naming
///
/// `base` is the name without extension; an existing `base.ext` yields
/// `base-1.ext`, `base-2.ext`, and so on. Returns the path written.
///
/// # Errors
///
/// Returns [`Error::Encode`] on any filesystem failure.
pub fn persist(image: &EncodedImage, dir: &Path, base: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| Error::Encode(e.to_string()))?;
    let path = unique_path(dir, base, image.format.extension());
    std::fs::write(&path, &image.bytes).map_err(|e| Error::Encode(e.to_string()))?;
    tracing::info!(path = %path.display(), bytes = image.bytes.len(), "frame persisted");
    Ok(path)
}

/// Default timestamped base name for a captured frame
#[must_use]
pub fn default_base_name() -> String {
    format!("lookout-{}", chrono::Local::now().format("%Y%m%d-%H%M%S"))
}

fn unique_path(dir: &Path, base: &str, ext: &str) -> PathBuf {
    let candidate = dir.join(format!("{base}.{ext}"));
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{base}-{n}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
