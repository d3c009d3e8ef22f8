// THEORY:
// Sinks are the observer side of the pipeline. After every frame the pipeline
// hands its `FrameResult` to each registered sink, synchronously, on the
// analysis thread. A sink must therefore never block: it copies what it needs
// and hands it off to whatever presentation context it serves. The channel
// sinks here use tokio primitives whose send side is non-blocking and
// runtime-agnostic, so they work from a plain thread as well as from a task.

use crate::pipeline::FrameResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::trace;

/// Receives every frame's result. Implementations must return promptly.
pub trait ResultSink: Send {
    fn notify(&self, result: &FrameResult);
}

impl<F> ResultSink for F
where
    F: Fn(&FrameResult) + Send,
{
    fn notify(&self, result: &FrameResult) {
        self(result)
    }
}

/// Latest-value-wins delivery. A renderer that redraws at its own pace reads
/// the most recent result and never sees a backlog.
pub struct WatchSink {
    sender: watch::Sender<Option<FrameResult>>,
}

impl WatchSink {
    pub fn new() -> (Self, watch::Receiver<Option<FrameResult>>) {
        let (sender, receiver) = watch::channel(None);
        (Self { sender }, receiver)
    }
}

impl ResultSink for WatchSink {
    fn notify(&self, result: &FrameResult) {
        // `send_replace` stores the value even when nobody is subscribed yet.
        self.sender.send_replace(Some(result.clone()));
    }
}

/// Queued delivery with a bounded buffer. When the consumer falls behind,
/// results are dropped and counted instead of stalling the pipeline.
pub struct ChannelSink {
    sender: mpsc::Sender<FrameResult>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<FrameResult>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let sink = Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, receiver)
    }

    /// Shared counter of results that could not be queued.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ResultSink for ChannelSink {
    fn notify(&self, result: &FrameResult) {
        if let Err(err) = self.sender.try_send(result.clone()) {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            match err {
                mpsc::error::TrySendError::Full(_) => trace!(total, "result queue full, dropping"),
                mpsc::error::TrySendError::Closed(_) => {
                    trace!(total, "result receiver gone, dropping")
                }
            }
        }
    }
}

/// Forwards only the frames that ended a rally. Every point reaches the
/// receiver no matter how far the consumer lags, which a `WatchSink` cannot
/// promise since `point_awarded` is set on a single frame. At most one result
/// is queued per miss episode.
pub struct PointSink {
    sender: mpsc::UnboundedSender<FrameResult>,
}

impl PointSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FrameResult>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ResultSink for PointSink {
    fn notify(&self, result: &FrameResult) {
        if result.point_awarded.is_none() {
            return;
        }
        if self.sender.send(result.clone()).is_err() {
            trace!("point receiver gone, dropping");
        }
    }
}
