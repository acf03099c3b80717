//! Synthetic frame source backend
//!
//! Drives the simulate mode and the test suite: a configurable device
//! list, frame format and cadence, plus failure injection for the absent
//! device, failed open, and silent stream cases.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    DeviceGroup, FrameBuffer, FrameSink, FrameSource, FrameSourceKind, FrameStream, PixelFormat,
    SourceFrame,
};
use crate::{Error, Result};

/// How the synthetic backend should behave when a stream is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimBehavior {
    /// Deliver frames at the configured cadence
    #[default]
    Healthy,
    /// `open_stream` fails as if the device vanished or is busy
    OpenFails,
    /// The stream opens but never delivers a frame
    NeverDelivers,
}

/// Synthetic camera backend
#[derive(Debug, Clone)]
pub struct SimFrameSource {
    groups: Vec<DeviceGroup>,
    format: PixelFormat,
    width: u32,
    height: u32,
    cadence: Duration,
    behavior: SimBehavior,
}

impl Default for SimFrameSource {
    fn default() -> Self {
        Self {
            groups: vec![
                DeviceGroup {
                    id: "sim-0".to_string(),
                    display_name: "Integrated Webcam".to_string(),
                    source_kinds: vec![FrameSourceKind::Color],
                },
                DeviceGroup {
                    id: "sim-1".to_string(),
                    display_name: "Kinect V2 Sensor".to_string(),
                    source_kinds: vec![
                        FrameSourceKind::Color,
                        FrameSourceKind::Depth,
                        FrameSourceKind::Infrared,
                    ],
                },
            ],
            format: PixelFormat::Nv12,
            width: 64,
            height: 48,
            cadence: Duration::from_millis(33),
            behavior: SimBehavior::Healthy,
        }
    }
}

impl SimFrameSource {
    /// Default device list with healthy delivery
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the advertised device groups
    #[must_use]
    pub fn with_groups(mut self, groups: Vec<DeviceGroup>) -> Self {
        self.groups = groups;
        self
    }

    /// Advertise no devices at all
    #[must_use]
    pub fn without_devices(mut self) -> Self {
        self.groups.clear();
        self
    }

    /// Set the source pixel format for generated frames
    #[must_use]
    pub const fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the delay between generated frames
    #[must_use]
    pub const fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Inject a failure mode
    #[must_use]
    pub const fn with_behavior(mut self, behavior: SimBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    #[allow(clippy::cast_possible_truncation)]
    fn generate(&self, n: u64) -> SourceFrame {
        let w = self.width as usize;
        let h = self.height as usize;
        let seed = (n % 251) as u8;
        let data = match self.format {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => vec![seed; w * h * 4],
            PixelFormat::Gray8 => vec![seed; w * h],
            PixelFormat::Nv12 => {
                let mut d = vec![seed; w * h];
                d.extend(std::iter::repeat_n(128, w * h / 2));
                d
            }
            PixelFormat::Yuy2 => {
                let mut d = Vec::with_capacity(w * h * 2);
                for _ in 0..(w * h / 2) {
                    d.extend_from_slice(&[seed, 128, seed, 128]);
                }
                d
            }
        };
        SourceFrame {
            kind: FrameSourceKind::Color,
            buffer: FrameBuffer {
                width: self.width,
                height: self.height,
                format: self.format,
                data,
            },
        }
    }
}

#[async_trait]
impl FrameSource for SimFrameSource {
    async fn enumerate(&self) -> Result<Vec<DeviceGroup>> {
        Ok(self.groups.clone())
    }

    async fn open_stream(
        &self,
        group: &DeviceGroup,
        sink: FrameSink,
    ) -> Result<Box<dyn FrameStream>> {
        if self.behavior == SimBehavior::OpenFails {
            return Err(Error::DeviceUnavailable(format!(
                "simulated open failure for {}",
                group.display_name
            )));
        }

        let task = if self.behavior == SimBehavior::NeverDelivers {
            // Hold the sink open without publishing; dropping it would
            // close the gate instead of leaving the stream silent.
            tokio::spawn(async move {
                let _sink = sink;
                std::future::pending::<()>().await;
            })
        } else {
            let source = self.clone();
            let cadence = self.cadence;
            tokio::spawn(async move {
                let mut n = 0;
                loop {
                    sink.publish(source.generate(n));
                    n += 1;
                    tokio::time::sleep(cadence).await;
                }
            })
        };

        Ok(Box::new(SimStream { task }))
    }
}

struct SimStream {
    task: tokio::task::JoinHandle<()>,
}

impl FrameStream for SimStream {
    fn stop(&mut self) {
        self.task.abort();
    }
}

impl Drop for SimStream {
    fn drop(&mut self) {
        self.stop();
    }
}
