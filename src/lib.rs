//! Lookout Gateway - Voice-triggered camera capture and face analysis
//!
//! This library provides the core functionality of the Lookout gateway:
//! - Capture device discovery and one-shot frame capture
//! - Frame normalization and raster encoding
//! - Remote face analysis with graceful degradation
//! - Time-boxed voice session orchestration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Assistant Host                       │
//! │   acknowledge │ progress │ success │ complete       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Session Controller                      │
//! │   state machine │ heartbeat │ cancellation          │
//! └──────┬──────────────────────┬───────────────────────┘
//!        │                      │
//! ┌──────▼───────────┐  ┌───────▼─────────────────────┐
//! │  Frame Source    │  │   Face Analysis Service     │
//! │  gate │ encode   │  │   (remote, best-effort)     │
//! └──────────────────┘  └─────────────────────────────┘
//! ```

pub mod analysis;
pub mod capture;
pub mod compose;
pub mod config;
pub mod error;
pub mod host;
pub mod session;

pub use analysis::{AnalysisClient, Face, FaceAttributes, FaceDetector, FaceRectangle};
pub use capture::{
    CaptureSession, DeviceGroup, EncodedImage, FrameBuffer, FrameGate, FrameSink, FrameSource,
    FrameSourceKind, ImageFormat, PixelFormat,
};
pub use compose::compose_message;
pub use config::Config;
pub use error::{Error, Result};
pub use host::{ConsoleHost, StdioHost, UserMessage, VoiceCommand, VoiceHost};
pub use session::{PipelinePhase, SessionController, SessionState, VoiceTask};
