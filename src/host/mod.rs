//! Assistant host boundary
//!
//! Each host adapter implements the [`VoiceHost`] trait to bridge the
//! session controller to a conversational assistant. Protocol discipline
//! the adapters share: `acknowledge` must be the first host call of a
//! session, progress/result calls come only after it, and `complete` is
//! issued exactly once per session by the controller.

mod console;
mod stdio;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::watch;

pub use console::ConsoleHost;
pub use stdio::StdioHost;

use crate::Result;

/// A recognized voice command plus its slot values
#[derive(Debug, Clone)]
pub struct VoiceCommand {
    /// Command name (e.g. `whoIsInMyRoom`)
    pub name: String,
    /// Recognized slot names mapped to their spoken values
    pub slots: HashMap<String, String>,
}

impl VoiceCommand {
    /// Build a command with a single slot
    #[must_use]
    pub fn with_slot(name: &str, slot: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            slots: HashMap::from([(slot.to_string(), value.to_string())]),
        }
    }
}

/// A display + spoken text pair sent to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    /// Text shown on screen
    pub display: String,
    /// Text spoken aloud
    pub spoken: String,
}

impl UserMessage {
    /// Build a message with identical display and spoken text
    #[must_use]
    pub fn spoken(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            display: text.clone(),
            spoken: text,
        }
    }
}

/// Trait for assistant host adapters
#[async_trait]
pub trait VoiceHost: Send + Sync {
    /// Establish the host connection and receive the triggering command.
    ///
    /// Must be called before any other host call; the host contract gives
    /// the session 0.5 seconds from invocation to make this call.
    ///
    /// # Errors
    ///
    /// Returns error if the connection cannot be established or the
    /// invocation is malformed.
    async fn acknowledge(&self) -> Result<VoiceCommand>;

    /// Report pipeline progress; required at least every 5 seconds
    ///
    /// # Errors
    ///
    /// Returns error if the host rejected or dropped the message.
    async fn report_progress(&self, message: &UserMessage) -> Result<()>;

    /// Deliver the final message for a successful session
    ///
    /// # Errors
    ///
    /// Returns error if the host rejected or dropped the message.
    async fn report_success(&self, message: UserMessage) -> Result<()>;

    /// Ask the host to launch the app in the foreground instead of
    /// running a pipeline (unrecognized command path)
    ///
    /// # Errors
    ///
    /// Returns error if the host rejected the directive.
    async fn request_app_launch(&self, message: UserMessage) -> Result<()>;

    /// Report session completion. The controller calls this exactly once
    /// per session, on every terminal path.
    async fn complete(&self);

    /// Receiver that flips to `true` when the host cancels the session.
    /// Repeated cancellation signals collapse into one observation.
    fn cancel_receiver(&self) -> watch::Receiver<bool>;
}

/// Await host cancellation on a receiver from [`VoiceHost::cancel_receiver`]
///
/// Resolves when the flag turns true; never resolves if the sender is kept
/// alive without cancelling.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if *rx.borrow() {
        return;
    }
    while rx.changed().await.is_ok() {
        if *rx.borrow() {
            return;
        }
    }
    // Sender dropped without cancelling; treat as never-cancelled.
    std::future::pending::<()>().await;
}
