//! Scheduled progress reporter
//!
//! The host cancels a session that goes 5 seconds without progress, so a
//! dedicated task reports on a fixed period regardless of what the
//! pipeline is doing. It reads the current phase from a watch channel and
//! is aborted together with the pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::ProgressUpdate;
use crate::host::{UserMessage, VoiceHost};

/// Spawn the heartbeat task
///
/// The first report goes out immediately; further reports follow every
/// `period`. The caller aborts the returned handle when the pipeline
/// reaches a terminal state.
pub fn spawn(
    host: Arc<dyn VoiceHost>,
    phase_rx: watch::Receiver<ProgressUpdate>,
    location: String,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let update = *phase_rx.borrow();
            let text = update.phase.message(&location);
            let text = if update.camera_on {
                format!("Camera on: {text}")
            } else {
                text
            };

            if let Err(e) = host.report_progress(&UserMessage::spoken(text)).await {
                tracing::warn!(error = %e, "progress report failed, stopping heartbeat");
                break;
            }
        }
    })
}
