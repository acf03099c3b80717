//! Voice session controller
//!
//! Top-level orchestration: acknowledge the host, route the command, drive
//! capture -> encode -> analysis -> compose, and report completion exactly
//! once on every terminal path. The heartbeat runs as an independent task
//! so a blocking network call can never starve progress reporting, and
//! host cancellation unwinds the pipeline by dropping it (which stops the
//! stream and abandons any in-flight request).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::{
    COMMAND_WHO_IS_IN_MY_ROOM, PipelinePhase, ProgressUpdate, SessionState, VoiceTask, heartbeat,
};
use crate::analysis::FaceDetector;
use crate::capture::{CaptureSession, EncodedImage, FrameGate, FrameSource, discover_device};
use crate::compose::compose_message;
use crate::config::Config;
use crate::host::{UserMessage, VoiceHost, cancelled};
use crate::{Error, Result};

/// Host contract: acknowledge within 0.5s of invocation
pub const ACK_BUDGET: Duration = Duration::from_millis(500);

/// Drives one voice session per invocation
pub struct SessionController {
    config: Config,
    source: Arc<dyn FrameSource>,
    detector: Arc<dyn FaceDetector>,
}

impl SessionController {
    /// Build a controller over a frame source and a face detector
    #[must_use]
    pub fn new(config: Config, source: Arc<dyn FrameSource>, detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            config,
            source,
            detector,
        }
    }

    /// Handle one host invocation end to end
    ///
    /// Acknowledges the host first, then either runs the pipeline (for the
    /// recognized command) or requests an app launch. Sends exactly one
    /// completion report on every terminal path, including cancellation.
    ///
    /// # Errors
    ///
    /// Returns error only for host protocol failures (acknowledge or
    /// message delivery); pipeline failures degrade into the final message.
    pub async fn handle_invocation(&self, host: Arc<dyn VoiceHost>) -> Result<()> {
        let started = Instant::now();
        let mut state = SessionState::Idle;

        // Must precede every other host call.
        let command = host.acknowledge().await?;
        state.transition(SessionState::Connected);

        let ack_elapsed = started.elapsed();
        if ack_elapsed > ACK_BUDGET {
            tracing::warn!(?ack_elapsed, "acknowledgment exceeded the host budget");
        }

        state.transition(SessionState::Dispatching);

        if command.name != COMMAND_WHO_IS_IN_MY_ROOM {
            tracing::info!(command = %command.name, "unrecognized command, requesting app launch");
            let launched = host
                .request_app_launch(UserMessage::spoken("Launching Lookout camera feed"))
                .await;
            state.transition(SessionState::Completed);
            // Completion is owed even when the launch directive failed.
            host.complete().await;
            return launched;
        }

        let task = VoiceTask::new(command, self.config.session.budget);
        let location = task.location();
        tracing::info!(session = %task.id, %location, "session dispatched");

        let (phase_tx, phase_rx) = watch::channel(ProgressUpdate {
            phase: PipelinePhase::Starting,
            camera_on: false,
        });
        let beat = heartbeat::spawn(
            Arc::clone(&host),
            phase_rx,
            location.clone(),
            self.config.session.heartbeat_period,
        );

        let mut cancel_rx = host.cancel_receiver();
        let outcome = tokio::select! {
            message = self.run_pipeline(&task, &location, &mut state, &phase_tx) => Some(message),
            () = cancelled(&mut cancel_rx) => None,
        };
        beat.abort();

        let delivery = match outcome {
            Some(message) => {
                state.transition(SessionState::Completed);
                host.report_success(message).await
            }
            None => {
                // Dropping the pipeline future released the stream and
                // abandoned any in-flight request; no further host
                // messages beyond the completion report.
                state.transition(SessionState::Cancelled);
                tracing::info!(session = %task.id, "session cancelled by host");
                Ok(())
            }
        };

        // Completion is owed even when the success report failed.
        host.complete().await;
        delivery
    }

    /// The capture-to-compose pipeline; every failure degrades in place
    async fn run_pipeline(
        &self,
        task: &VoiceTask,
        location: &str,
        state: &mut SessionState,
        phase_tx: &watch::Sender<ProgressUpdate>,
    ) -> UserMessage {
        state.transition(SessionState::AwaitingDevice);
        let image = self.capture_image(state, phase_tx).await;

        state.transition(SessionState::AwaitingAnalysis);
        phase_tx.send_modify(|u| u.phase = PipelinePhase::Detecting);
        let faces = match &image {
            Some(encoded) => self.detector.detect_faces(encoded, task.remaining()).await,
            None => Vec::new(),
        };

        state.transition(SessionState::Composing);
        UserMessage::spoken(compose_message(&faces, location))
    }

    /// Discover, stream, gate, encode, persist. Returns `None` on any
    /// absorbed failure; the session then completes image-less.
    async fn capture_image(
        &self,
        state: &mut SessionState,
        phase_tx: &watch::Sender<ProgressUpdate>,
    ) -> Option<EncodedImage> {
        let groups = match self.source.enumerate().await {
            Ok(groups) => groups,
            Err(e) => {
                tracing::warn!(error = %e, "device enumeration failed");
                return None;
            }
        };

        let Some(group) = discover_device(&groups, &self.config.device_filter) else {
            tracing::info!(
                filter = %self.config.device_filter,
                "no matching capture device, proceeding without an image"
            );
            return None;
        };

        let (sink, gate) = FrameGate::arm();
        let mut session = match CaptureSession::open(self.source.as_ref(), group, sink).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "stream open failed, proceeding without an image");
                return None;
            }
        };

        phase_tx.send_modify(|u| {
            u.camera_on = true;
            u.phase = PipelinePhase::ProcessingFrame;
        });

        state.transition(SessionState::AwaitingFrame);
        let frame = match gate
            .await_first_frame(self.config.capture.frame_timeout)
            .await
        {
            Ok(frame) => {
                session.mark_frame_ready();
                frame
            }
            Err(e) => {
                tracing::warn!(error = %e, "no frame arrived, proceeding without an image");
                session.teardown();
                return None;
            }
        };

        state.transition(SessionState::AwaitingUpload);
        phase_tx.send_modify(|u| u.phase = PipelinePhase::Uploading);

        let format = self.config.capture.format;
        let dir = self.config.capture.pictures_dir.clone();
        let encoded = tokio::task::spawn_blocking(move || {
            let encoded = crate::capture::encode(&frame, format)?;
            crate::capture::persist(&encoded, &dir, &crate::capture::default_base_name())?;
            Ok::<_, Error>(encoded)
        })
        .await;

        session.teardown();

        match encoded {
            Ok(Ok(image)) => Some(image),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "encode failed, proceeding without an image");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "encode task failed");
                None
            }
        }
    }
}
