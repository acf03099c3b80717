//! Voice session state machine and task types

pub mod controller;
pub mod heartbeat;

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

pub use controller::SessionController;

use crate::host::VoiceCommand;

/// The command the pipeline handles; anything else short-circuits to an
/// app-launch directive
pub const COMMAND_WHO_IS_IN_MY_ROOM: &str = "whoIsInMyRoom";

/// Slot carrying the spoken location label
pub const SLOT_LOCATION: &str = "location";

/// Fallback location label when the slot is missing
pub const DEFAULT_LOCATION: &str = "the room";

/// States a voice session moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection yet
    Idle,
    /// Host acknowledged, command received
    Connected,
    /// Command routed to a handler
    Dispatching,
    /// Discovering and opening the capture device
    AwaitingDevice,
    /// Waiting on the first frame through the gate
    AwaitingFrame,
    /// Encoding and persisting the frame
    AwaitingUpload,
    /// Remote face detection in flight
    AwaitingAnalysis,
    /// Building the final message
    Composing,
    /// Terminal: exactly one completion report sent
    Completed,
    /// Terminal: host-initiated cancellation
    Cancelled,
}

impl SessionState {
    /// Whether the session has reached a terminal state
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether `next` is a legal successor of `self`
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        // Cancelled is reachable from every non-terminal state.
        if next == Self::Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Self::Idle, Self::Connected)
                | (Self::Connected, Self::Dispatching)
                | (Self::Dispatching, Self::AwaitingDevice | Self::Completed)
                | (Self::AwaitingDevice, Self::AwaitingFrame | Self::AwaitingAnalysis)
                | (Self::AwaitingFrame, Self::AwaitingUpload | Self::AwaitingAnalysis)
                | (Self::AwaitingUpload, Self::AwaitingAnalysis)
                | (Self::AwaitingAnalysis, Self::Composing)
                | (Self::Composing, Self::Completed)
        )
    }

    /// Move to `next` if legal; illegal transitions are rejected as a no-op
    ///
    /// # Panics
    ///
    /// Debug builds assert on an illegal transition.
    pub fn transition(&mut self, next: Self) {
        if self.can_transition_to(next) {
            tracing::debug!(from = ?self, to = ?next, "session state transition");
            *self = next;
        } else {
            debug_assert!(false, "illegal transition {self:?} -> {next:?}");
            tracing::warn!(from = ?self, to = ?next, "illegal transition rejected");
        }
    }
}

/// Progress phases, each with its host-facing message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Camera feed starting
    Starting,
    /// First frame being processed
    ProcessingFrame,
    /// Encoded image being sent
    Uploading,
    /// Remote detection in flight
    Detecting,
}

impl PipelinePhase {
    /// The progress text for this phase
    #[must_use]
    pub fn message(self, location: &str) -> String {
        match self {
            Self::Starting => format!("Starting up the camera feed for {location}"),
            Self::ProcessingFrame => format!("Processing the camera image for {location}"),
            Self::Uploading => format!("Sending the image for analysis for {location}"),
            Self::Detecting => format!("Detecting faces for {location}"),
        }
    }
}

/// What the heartbeat task reports between pipeline steps
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    /// Current pipeline phase
    pub phase: PipelinePhase,
    /// Whether the camera stream is live ("Camera on: " prefix)
    pub camera_on: bool,
}

/// One host-triggered invocation, scoped to a single session
#[derive(Debug)]
pub struct VoiceTask {
    /// Correlation id for tracing
    pub id: Uuid,
    /// The triggering command
    pub command: VoiceCommand,
    /// Deadline derived from the overall session budget
    pub deadline: Instant,
}

impl VoiceTask {
    /// Start a task clock for `command` with the given overall budget
    #[must_use]
    pub fn new(command: VoiceCommand, budget: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            command,
            deadline: Instant::now() + budget,
        }
    }

    /// The location slot, or the fallback label
    #[must_use]
    pub fn location(&self) -> String {
        self.command
            .slots
            .get(SLOT_LOCATION)
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string())
    }

    /// Budget remaining before the deadline
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
