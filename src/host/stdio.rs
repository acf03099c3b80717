//! App-service style host adapter over stdio
//!
//! Speaks JSON lines: one `invocation` object arrives on stdin, progress
//! and result objects go out on stdout, and an asynchronous `cancel` line
//! may arrive at any point. A dedicated reader thread owns stdin so
//! cancellation is observed while the pipeline runs.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};

use super::{UserMessage, VoiceCommand, VoiceHost};
use crate::{Error, Result};

/// One line of the stdio host protocol
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    /// Host -> gateway: the triggering voice command
    Invocation {
        command: String,
        #[serde(default)]
        slots: HashMap<String, String>,
    },
    /// Host -> gateway: cancel the running session
    Cancel,
    /// Gateway -> host: progress report
    Progress { display: String, spoken: String },
    /// Gateway -> host: final message
    Success { display: String, spoken: String },
    /// Gateway -> host: app-launch directive
    Launch { display: String, spoken: String },
    /// Gateway -> host: session completion report
    Complete,
}

/// JSON-lines host adapter over the process's stdin/stdout
pub struct StdioHost {
    invocation_rx: Mutex<Option<oneshot::Receiver<VoiceCommand>>>,
    cancel_rx: watch::Receiver<bool>,
    stdout: Mutex<std::io::Stdout>,
}

impl StdioHost {
    /// Spawn the stdin reader thread and return the adapter
    #[must_use]
    pub fn new() -> Self {
        let (invocation_tx, invocation_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        std::thread::spawn(move || {
            read_stdin(invocation_tx, &cancel_tx);
        });

        Self {
            invocation_rx: Mutex::new(Some(invocation_rx)),
            cancel_rx,
            stdout: Mutex::new(std::io::stdout()),
        }
    }

    fn write_event(&self, event: &WireEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut out = self
            .stdout
            .lock()
            .map_err(|_| Error::Host("stdout lock poisoned".to_string()))?;
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

impl Default for StdioHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader thread body: first `invocation` resolves the oneshot, any
/// `cancel` flips the watch flag. EOF counts as cancellation — the host
/// side went away.
fn read_stdin(invocation_tx: oneshot::Sender<VoiceCommand>, cancel_tx: &watch::Sender<bool>) {
    let mut invocation_tx = Some(invocation_tx);
    let reader = BufReader::new(std::io::stdin());

    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<WireEvent>(&line) {
            Ok(WireEvent::Invocation { command, slots }) => {
                if let Some(tx) = invocation_tx.take() {
                    let _ = tx.send(VoiceCommand {
                        name: command,
                        slots,
                    });
                } else {
                    tracing::warn!("duplicate invocation line ignored");
                }
            }
            Ok(WireEvent::Cancel) => {
                tracing::info!("host requested cancellation");
                let _ = cancel_tx.send(true);
            }
            Ok(other) => {
                tracing::warn!(event = ?other, "unexpected event direction on stdin");
            }
            Err(e) => {
                tracing::warn!(error = %e, "unparseable host line ignored");
            }
        }
    }

    let _ = cancel_tx.send(true);
}

#[async_trait]
impl VoiceHost for StdioHost {
    async fn acknowledge(&self) -> Result<VoiceCommand> {
        let rx = self
            .invocation_rx
            .lock()
            .map_err(|_| Error::Host("invocation lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| Error::Host("session already acknowledged".to_string()))?;

        rx.await
            .map_err(|_| Error::Host("stdin closed before an invocation arrived".to_string()))
    }

    async fn report_progress(&self, message: &UserMessage) -> Result<()> {
        self.write_event(&WireEvent::Progress {
            display: message.display.clone(),
            spoken: message.spoken.clone(),
        })
    }

    async fn report_success(&self, message: UserMessage) -> Result<()> {
        self.write_event(&WireEvent::Success {
            display: message.display,
            spoken: message.spoken,
        })
    }

    async fn request_app_launch(&self, message: UserMessage) -> Result<()> {
        self.write_event(&WireEvent::Launch {
            display: message.display,
            spoken: message.spoken,
        })
    }

    async fn complete(&self) {
        if let Err(e) = self.write_event(&WireEvent::Complete) {
            tracing::warn!(error = %e, "failed to write completion report");
        }
    }

    fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.cancel_rx.clone()
    }
}
