//! Frame source management
//!
//! Discovers capture device groups, opens one stream per session, and
//! normalizes pushed frames to 8-bit BGRA before publication. The device
//! boundary is the [`FrameSource`] trait; platform capture backends plug in
//! behind it, and [`sim::SimFrameSource`] provides the in-tree backend for
//! the simulate mode and tests.

mod encode;
mod gate;
pub mod sim;

use async_trait::async_trait;

pub use encode::{EncodedImage, ImageFormat, default_base_name, encode, persist};
pub use gate::{FrameGate, FrameSink};

use crate::{Error, Result};

/// Capability stream kinds a device group may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSourceKind {
    /// Color camera stream — the only kind that feeds the pipeline
    Color,
    /// Infrared stream
    Infrared,
    /// Depth stream
    Depth,
    /// Long-exposure infrared stream
    LongExposureInfrared,
    /// Body tracking stream
    Body,
    /// Body index stream
    BodyIndex,
}

/// Pixel formats a color stream may deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit BGRA — the normalized format downstream encoding assumes
    Bgra8,
    /// 8-bit RGBA
    Rgba8,
    /// 8-bit grayscale
    Gray8,
    /// Planar Y followed by interleaved half-resolution UV
    Nv12,
    /// Packed Y0 U Y1 V, two pixels per four bytes
    Yuy2,
}

/// Latest decoded pixel buffer for one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format of `data`
    pub format: PixelFormat,
    /// Raw pixel data
    pub data: Vec<u8>,
}

/// A frame as pushed by a capture backend, before normalization
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// Which capability stream produced the frame
    pub kind: FrameSourceKind,
    /// The pixel payload
    pub buffer: FrameBuffer,
}

/// A discoverable bundle of camera capability streams exposed as one
/// logical device
#[derive(Debug, Clone)]
pub struct DeviceGroup {
    /// Backend-specific identifier
    pub id: String,
    /// Human-readable name used for discovery filtering
    pub display_name: String,
    /// Capability streams the group advertises
    pub source_kinds: Vec<FrameSourceKind>,
}

/// A running stream; dropping or stopping it releases the device
pub trait FrameStream: Send {
    /// Stop frame delivery and release the underlying device
    fn stop(&mut self);
}

/// Device boundary: enumerate capture device groups and open streams
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// List the device groups currently visible to this backend
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if enumeration itself fails.
    async fn enumerate(&self) -> Result<Vec<DeviceGroup>>;

    /// Open the color stream of `group` with shared read-only semantics,
    /// pushing every arriving frame into `sink`
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if the device vanished or is busy.
    async fn open_stream(&self, group: &DeviceGroup, sink: FrameSink)
    -> Result<Box<dyn FrameStream>>;
}

/// Select a device group by substring match on display name
///
/// Deterministic: takes the first match in enumeration order. No match is
/// `None`, not an error — the caller proceeds without an image.
#[must_use]
pub fn discover_device<'a>(groups: &'a [DeviceGroup], name_filter: &str) -> Option<&'a DeviceGroup> {
    groups
        .iter()
        .find(|g| g.display_name.contains(name_filter))
}

/// One capture session: the opened stream plus its status flags
///
/// Exclusively owned by the pipeline; torn down on completion or
/// cancellation. `device_found` and `streaming` are tracked separately so
/// callers can tell "no camera" from "camera live" (the user-facing message
/// stays best-effort either way).
pub struct CaptureSession {
    /// A device group matched the discovery filter
    pub device_found: bool,
    /// The stream opened and is delivering
    pub streaming: bool,
    /// The first normalized frame was handed off to the gate
    pub frame_ready: bool,
    group_name: String,
    stream: Option<Box<dyn FrameStream>>,
}

impl CaptureSession {
    /// Open a stream on `group`, pushing frames into `sink`
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if the stream cannot be opened.
    pub async fn open(
        source: &dyn FrameSource,
        group: &DeviceGroup,
        sink: FrameSink,
    ) -> Result<Self> {
        let stream = source.open_stream(group, sink).await?;
        tracing::info!(device = %group.display_name, "stream started");
        Ok(Self {
            device_found: true,
            streaming: true,
            frame_ready: false,
            group_name: group.display_name.clone(),
            stream: Some(stream),
        })
    }

    /// Record that the gate resolved with the first frame
    pub const fn mark_frame_ready(&mut self) {
        self.frame_ready = true;
    }

    /// Stop the stream and release the device. Idempotent.
    pub fn teardown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            self.streaming = false;
            tracing::debug!(device = %self.group_name, "stream stopped");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Convert a frame to 8-bit BGRA
///
/// Already-BGRA input passes through unchanged; every other supported
/// format is converted. Downstream encoding assumes BGRA8, so this runs on
/// every published frame. A buffer shorter than its dimensions imply
/// (stride-padded backends report width, not stride) is left unconverted;
/// the encoder rejects it later and the session proceeds image-less.
#[must_use]
pub fn normalize(frame: FrameBuffer) -> FrameBuffer {
    let required = min_buffer_len(frame.format, frame.width, frame.height);
    if frame.data.len() < required {
        tracing::warn!(
            format = ?frame.format,
            width = frame.width,
            height = frame.height,
            len = frame.data.len(),
            required,
            "frame buffer shorter than its dimensions imply, skipping conversion"
        );
        return frame;
    }

    let FrameBuffer {
        width,
        height,
        format,
        data,
    } = frame;

    let data = match format {
        PixelFormat::Bgra8 => data,
        PixelFormat::Rgba8 => rgba_to_bgra(&data),
        PixelFormat::Gray8 => gray_to_bgra(&data),
        PixelFormat::Nv12 => nv12_to_bgra(&data, width, height),
        PixelFormat::Yuy2 => yuy2_to_bgra(&data, width, height),
    };

    FrameBuffer {
        width,
        height,
        format: PixelFormat::Bgra8,
        data,
    }
}

/// Smallest buffer the converter for `format` will read through
fn min_buffer_len(format: PixelFormat, width: u32, height: u32) -> usize {
    let px = width as usize * height as usize;
    match format {
        PixelFormat::Bgra8 | PixelFormat::Rgba8 => px * 4,
        PixelFormat::Gray8 => px,
        // Y plane plus one interleaved UV pair per 2x2 block, with odd
        // dimensions rounding the chroma plane up.
        PixelFormat::Nv12 => {
            px + (height as usize).div_ceil(2) * (width as usize).div_ceil(2) * 2
        }
        PixelFormat::Yuy2 => px.div_ceil(2) * 4,
    }
}

/// Swap the R and B channels
fn rgba_to_bgra(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(4) {
        out.push(px[2]);
        out.push(px[1]);
        out.push(px[0]);
        out.push(px[3]);
    }
    out
}

/// Replicate luma into each color channel, opaque alpha
fn gray_to_bgra(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 4);
    for &v in data {
        out.extend_from_slice(&[v, v, v, 255]);
    }
    out
}

/// BT.601 YUV -> RGB, clamped to 0..=255
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn yuv_to_bgra(y: u8, u: u8, v: u8) -> [u8; 4] {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;

    let r = ((298 * c + 409 * e + 128) >> 8).clamp(0, 255) as u8;
    let g = ((298 * c - 100 * d - 208 * e + 128) >> 8).clamp(0, 255) as u8;
    let b = ((298 * c + 516 * d + 128) >> 8).clamp(0, 255) as u8;

    [b, g, r, 255]
}

/// Planar Y plane followed by interleaved half-resolution UV plane
#[allow(clippy::cast_possible_truncation)]
fn nv12_to_bgra(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let uv_base = w * h;
    let mut out = Vec::with_capacity(w * h * 4);

    for row in 0..h {
        for col in 0..w {
            let y = data[row * w + col];
            let uv = uv_base + (row / 2) * w + (col / 2) * 2;
            let (u, v) = (data[uv], data[uv + 1]);
            out.extend_from_slice(&yuv_to_bgra(y, u, v));
        }
    }
    out
}

/// Packed Y0 U Y1 V, two pixels per four bytes
#[allow(clippy::cast_possible_truncation)]
fn yuy2_to_bgra(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut out = Vec::with_capacity(w * h * 4);

    for row in 0..h {
        for col in 0..w {
            let pair = (row * w + col) / 2 * 4;
            let y = if col % 2 == 0 {
                data[pair]
            } else {
                data[pair + 2]
            };
            let (u, v) = (data[pair + 1], data[pair + 3]);
            out.extend_from_slice(&yuv_to_bgra(y, u, v));
        }
    }
    out
}

impl std::str::FromStr for PixelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bgra8" => Ok(Self::Bgra8),
            "rgba8" => Ok(Self::Rgba8),
            "gray8" => Ok(Self::Gray8),
            "nv12" => Ok(Self::Nv12),
            "yuy2" => Ok(Self::Yuy2),
            other => Err(Error::Config(format!("unknown pixel format: {other}"))),
        }
    }
}
