//! Link Reader -> Dispatcher queue with explicit overflow policy

use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{DropPolicy, RawFrame};
use metrics::counter;
use tracing::trace;

use crate::config::{BackpressureConfig, IngestionMetrics};

/// Consumer side of the frame queue
pub type FrameReceiver = Receiver<RawFrame>;

/// What happened to a frame handed to [`FrameSender::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Enqueued without loss
    Queued,
    /// Enqueued after evicting the oldest queued frame
    EvictedOldest,
    /// Discarded because the queue was full
    Dropped,
    /// Every consumer is gone
    Closed,
}

/// Create the frame queue
pub fn frame_queue(
    config: &BackpressureConfig,
    metrics: Arc<IngestionMetrics>,
) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = bounded(config.channel_capacity.max(1));
    let evict = (config.drop_policy == DropPolicy::DropOldest).then(|| rx.clone());

    let sender = FrameSender {
        tx,
        evict,
        policy: config.drop_policy,
        metrics,
    };
    (sender, rx)
}

/// Producer side of the frame queue
#[derive(Debug)]
pub struct FrameSender {
    tx: Sender<RawFrame>,
    /// Receiver clone used only to evict the oldest frame under `DropOldest`
    evict: Option<Receiver<RawFrame>>,
    policy: DropPolicy,
    metrics: Arc<IngestionMetrics>,
}

impl FrameSender {
    /// Enqueue a frame according to the drop policy
    ///
    /// Under `Block` this waits for room.
    pub fn send(&self, frame: RawFrame) -> SendOutcome {
        let outcome = match self.policy {
            DropPolicy::Block => match self.tx.send_blocking(frame) {
                Ok(()) => SendOutcome::Queued,
                Err(_) => SendOutcome::Closed,
            },
            DropPolicy::DropNewest => match self.tx.try_send(frame) {
                Ok(()) => SendOutcome::Queued,
                Err(TrySendError::Full(_)) => {
                    self.record_drop();
                    trace!("frame dropped (newest)");
                    SendOutcome::Dropped
                }
                Err(TrySendError::Closed(_)) => SendOutcome::Closed,
            },
            DropPolicy::DropOldest => self.send_evicting(frame),
        };

        self.metrics.update_queue_len(self.tx.len());
        outcome
    }

    fn send_evicting(&self, mut frame: RawFrame) -> SendOutcome {
        let Some(evict) = &self.evict else {
            return match self.tx.try_send(frame) {
                Ok(()) => SendOutcome::Queued,
                Err(TrySendError::Full(_)) => {
                    self.record_drop();
                    SendOutcome::Dropped
                }
                Err(TrySendError::Closed(_)) => SendOutcome::Closed,
            };
        };

        let mut evicted = false;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) if evicted => return SendOutcome::EvictedOldest,
                Ok(()) => return SendOutcome::Queued,
                Err(TrySendError::Full(returned)) => {
                    frame = returned;
                    // The consumer may have emptied a slot in between; then just retry
                    if evict.try_recv().is_ok() {
                        self.record_drop();
                        trace!("frame dropped (oldest)");
                        evicted = true;
                    }
                }
                Err(TrySendError::Closed(_)) => return SendOutcome::Closed,
            }
        }
    }

    fn record_drop(&self) {
        self.metrics.record_dropped();
        counter!("radar_link_frames_dropped_total", "reason" => "queue_full").increment(1);
    }

    /// Whether every consumer has gone away
    pub fn consumer_gone(&self) -> bool {
        let own = usize::from(self.evict.is_some());
        self.tx.is_closed() || self.tx.receiver_count() <= own
    }

    /// Frames currently queued
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn policy(&self) -> DropPolicy {
        self.policy
    }
}
