//! Interactive console host adapter
//!
//! Backs the `simulate` subcommand: the invocation is provided up front,
//! host messages print to the terminal, and Ctrl-C maps to host
//! cancellation.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use super::{UserMessage, VoiceCommand, VoiceHost};
use crate::{Error, Result};

/// Console host with a pre-seeded invocation
pub struct ConsoleHost {
    command: Mutex<Option<VoiceCommand>>,
    cancel_rx: watch::Receiver<bool>,
}

impl ConsoleHost {
    /// Build a console host that will deliver `command` on acknowledge
    /// and cancel on Ctrl-C
    #[must_use]
    pub fn new(command: VoiceCommand) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = cancel_tx.send(true);
            }
        });

        Self {
            command: Mutex::new(Some(command)),
            cancel_rx,
        }
    }
}

#[async_trait]
impl VoiceHost for ConsoleHost {
    async fn acknowledge(&self) -> Result<VoiceCommand> {
        self.command
            .lock()
            .map_err(|_| Error::Host("command lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| Error::Host("session already acknowledged".to_string()))
    }

    async fn report_progress(&self, message: &UserMessage) -> Result<()> {
        println!("[progress] {}", message.display);
        Ok(())
    }

    async fn report_success(&self, message: UserMessage) -> Result<()> {
        println!("[success] {}", message.display);
        Ok(())
    }

    async fn request_app_launch(&self, message: UserMessage) -> Result<()> {
        println!("[launch] {}", message.spoken);
        Ok(())
    }

    async fn complete(&self) {
        println!("[complete]");
    }

    fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.cancel_rx.clone()
    }
}
