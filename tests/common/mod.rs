//! Shared test hosts and frame sources

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use lookout_gateway::capture::sim::SimFrameSource;
use lookout_gateway::{
    Config, EncodedImage, Error, Face, FaceAttributes, FaceDetector, FaceRectangle, FrameSink,
    FrameSource, Result, UserMessage, VoiceCommand, VoiceHost,
};
use lookout_gateway::capture::{DeviceGroup, FrameStream};
use lookout_gateway::config::{AnalysisConfig, CaptureConfig, SessionConfig};
use lookout_gateway::ImageFormat;

/// Host call ordering, for protocol assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Acknowledge,
    Progress(String),
    Success(String),
    Launch(String),
    Complete,
}

/// Mock assistant host recording every call
pub struct MockHost {
    command: Mutex<Option<VoiceCommand>>,
    pub calls: Mutex<Vec<HostCall>>,
    pub completes: AtomicUsize,
    fail_delivery: bool,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl MockHost {
    pub fn new(command: VoiceCommand) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            command: Mutex::new(Some(command)),
            calls: Mutex::new(Vec::new()),
            completes: AtomicUsize::new(0),
            fail_delivery: false,
            cancel_tx,
            cancel_rx,
        }
    }

    /// Make final-message delivery (success or launch) fail
    pub fn with_failing_delivery(mut self) -> Self {
        self.fail_delivery = true;
        self
    }

    /// Trigger host-side cancellation
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Success(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn progress_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, HostCall::Progress(_)))
            .count()
    }
}

#[async_trait]
impl VoiceHost for MockHost {
    async fn acknowledge(&self) -> Result<VoiceCommand> {
        self.calls.lock().unwrap().push(HostCall::Acknowledge);
        Ok(self.command.lock().unwrap().take().expect("acknowledged twice"))
    }

    async fn report_progress(&self, message: &UserMessage) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(HostCall::Progress(message.display.clone()));
        Ok(())
    }

    async fn report_success(&self, message: UserMessage) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(HostCall::Success(message.display));
        if self.fail_delivery {
            return Err(Error::Host("host dropped the message".to_string()));
        }
        Ok(())
    }

    async fn request_app_launch(&self, message: UserMessage) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(HostCall::Launch(message.spoken));
        if self.fail_delivery {
            return Err(Error::Host("host dropped the message".to_string()));
        }
        Ok(())
    }

    async fn complete(&self) {
        self.calls.lock().unwrap().push(HostCall::Complete);
        self.completes.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.cancel_rx.clone()
    }
}

/// Detector returning a fixed face list, recording call count
pub struct FixedDetector {
    faces: Vec<Face>,
    pub calls: AtomicUsize,
    delay: Duration,
}

impl FixedDetector {
    pub fn new(faces: Vec<Face>) -> Self {
        Self {
            faces,
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Simulate a slow network call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl FaceDetector for FixedDetector {
    async fn detect_faces(&self, _image: &EncodedImage, _budget: Duration) -> Vec<Face> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        self.faces.clone()
    }
}

/// Frame source wrapper counting stream stops, to assert device release
pub struct TrackingSource {
    inner: SimFrameSource,
    pub stops: Arc<AtomicUsize>,
}

impl TrackingSource {
    pub fn new(inner: SimFrameSource) -> Self {
        Self {
            inner,
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl FrameSource for TrackingSource {
    async fn enumerate(&self) -> Result<Vec<DeviceGroup>> {
        self.inner.enumerate().await
    }

    async fn open_stream(
        &self,
        group: &DeviceGroup,
        sink: FrameSink,
    ) -> Result<Box<dyn FrameStream>> {
        let stream = self.inner.open_stream(group, sink).await?;
        Ok(Box::new(TrackingStream {
            inner: Some(stream),
            stops: Arc::clone(&self.stops),
        }))
    }
}

struct TrackingStream {
    inner: Option<Box<dyn FrameStream>>,
    stops: Arc<AtomicUsize>,
}

impl FrameStream for TrackingStream {
    fn stop(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.stop();
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// A face with the given age and gender label
pub fn face(age: f64, gender: &str) -> Face {
    Face {
        rectangle: FaceRectangle {
            top: 0,
            left: 0,
            width: 32,
            height: 32,
        },
        attributes: Some(FaceAttributes {
            age,
            gender: gender.to_string(),
            smile: false,
            facial_hair: false,
            head_pose: None,
        }),
    }
}

/// Test configuration with fast timings and a temp pictures directory
pub fn test_config(pictures_dir: std::path::PathBuf) -> Config {
    Config {
        device_filter: "Kinect".to_string(),
        capture: CaptureConfig {
            pictures_dir,
            format: ImageFormat::Png,
            frame_timeout: Duration::from_millis(500),
        },
        analysis: AnalysisConfig {
            endpoint: None,
            key: None,
        },
        session: SessionConfig {
            heartbeat_period: Duration::from_millis(50),
            budget: Duration::from_secs(5),
        },
    }
}

/// The recognized command with a location slot
pub fn who_is_in(location: &str) -> VoiceCommand {
    VoiceCommand::with_slot("whoIsInMyRoom", "location", location)
}
