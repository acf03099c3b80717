//! Capture completion gate
//!
//! Converts repeated callback-driven frame arrivals into a single resolved
//! "frame ready" event. The writer side is a single-slot overwrite-latest
//! mailbox; the reader side drains it exactly once through a oneshot
//! receiver, so nothing polls a flag across execution contexts.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use super::{FrameBuffer, FrameSourceKind, SourceFrame, normalize};
use crate::{Error, Result};

/// Reader half: resolves once, on the first frame published after arming
pub struct FrameGate {
    rx: oneshot::Receiver<FrameBuffer>,
}

/// Writer half, handed to the capture backend. Cloneable; publishes from
/// the frame-arrival callback context.
#[derive(Clone)]
pub struct FrameSink {
    inner: Arc<SinkInner>,
}

struct SinkInner {
    // Taken by the first color frame; later publishes overwrite `latest`,
    // which nothing re-reads for this gate instance.
    tx: Mutex<Option<oneshot::Sender<FrameBuffer>>>,
    latest: Mutex<Option<FrameBuffer>>,
}

impl FrameGate {
    /// Arm a new gate, returning the sink to hand to the capture backend
    #[must_use]
    pub fn arm() -> (FrameSink, Self) {
        let (tx, rx) = oneshot::channel();
        let sink = FrameSink {
            inner: Arc::new(SinkInner {
                tx: Mutex::new(Some(tx)),
                latest: Mutex::new(None),
            }),
        };
        (sink, Self { rx })
    }

    /// Suspend until the first normalized frame arrives, or `timeout` elapses
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if no frame arrives within
    /// `timeout` or the sink was dropped before delivering one.
    pub async fn await_first_frame(self, timeout: Duration) -> Result<FrameBuffer> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(Error::DeviceUnavailable(
                "frame source closed before a frame arrived".to_string(),
            )),
            Err(_) => Err(Error::DeviceUnavailable(format!(
                "no frame within {timeout:?}"
            ))),
        }
    }
}

impl FrameSink {
    /// Publish an arriving frame
    ///
    /// Non-color frames are skipped. The frame is normalized to BGRA8, then
    /// either resolves the gate (first color frame) or overwrites the latest
    /// slot (every later frame).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn publish(&self, frame: SourceFrame) {
        if frame.kind != FrameSourceKind::Color {
            tracing::trace!(kind = ?frame.kind, "skipping non-color frame");
            return;
        }

        let normalized = normalize(frame.buffer);
        let pending = self.inner.tx.lock().unwrap().take();
        if let Some(tx) = pending {
            // Receiver may have timed out already; the frame is then dropped.
            let _ = tx.send(normalized);
        } else {
            *self.inner.latest.lock().unwrap() = Some(normalized);
        }
    }

    /// Whether the gate has already been resolved by a published frame
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn resolved(&self) -> bool {
        self.inner.tx.lock().unwrap().is_none()
    }
}
