//! SinkHandle - per-sink report queue and worker task
//!
//! Each sink drains its own bounded queue, so a failing sink never stops the
//! others. What happens when that queue is full is the sink's
//! [`SinkOverflow`] policy: `Block` makes the dispatch loop wait (the backlog
//! then lands on the frame queue and its drop policy), `DropNewest` drops the
//! report here and counts it.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{RadarReport, ReportSink, SinkOverflow};

use crate::metrics::SinkMetrics;

/// Outcome of handing one report to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued without waiting
    Queued,
    /// Queued after waiting for the sink to catch up
    Waited,
    /// Queue full under `DropNewest`; the report is gone
    Dropped,
    /// The worker is gone
    Closed,
}

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    overflow: SinkOverflow,
    tx: mpsc::Sender<RadarReport>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker for `sink` behind a queue of `queue_capacity` reports
    pub fn spawn<S: ReportSink + Send + 'static>(
        sink: S,
        queue_capacity: usize,
        overflow: SinkOverflow,
    ) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = tokio::spawn(drain_into_sink(sink, rx, metrics.clone()));

        Self {
            name,
            overflow,
            tx,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn overflow(&self) -> SinkOverflow {
        self.overflow
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Hand a report to the sink under its overflow policy
    pub async fn deliver(&self, report: RadarReport) -> Delivery {
        let delivery = match self.tx.try_send(report) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
            Err(mpsc::error::TrySendError::Full(report)) => self.on_full(report).await,
        };

        match delivery {
            Delivery::Queued | Delivery::Waited => {
                self.metrics.set_queue_len(self.queued());
            }
            Delivery::Dropped => {}
            Delivery::Closed => error!(sink = %self.name, "sink worker closed unexpectedly"),
        }
        delivery
    }

    async fn on_full(&self, report: RadarReport) -> Delivery {
        match self.overflow {
            SinkOverflow::Block => {
                self.metrics.inc_stalled_count();
                debug!(sink = %self.name, sequence = report.sequence, "sink queue full, waiting");
                match self.tx.send(report).await {
                    Ok(()) => Delivery::Waited,
                    Err(_) => Delivery::Closed,
                }
            }
            SinkOverflow::DropNewest => {
                self.metrics.inc_dropped_count();
                counter!("radar_link_reports_dropped_total", "sink" => self.name.clone())
                    .increment(1);
                warn!(
                    sink = %self.name,
                    sequence = report.sequence,
                    targets = report.target_count(),
                    "sink queue full, report dropped"
                );
                Delivery::Dropped
            }
        }
    }

    fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Close the queue and wait for the worker to write what is left
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "sink worker panicked");
        }
    }
}

/// Write every queued report, then flush and close the sink
#[instrument(name = "sink_worker", skip_all, fields(sink = %sink.name()))]
async fn drain_into_sink<S: ReportSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<RadarReport>,
    metrics: Arc<SinkMetrics>,
) {
    while let Some(report) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        if let Err(e) = sink.write(&report).await {
            metrics.inc_failure_count();
            error!(sequence = report.sequence, error = %e, "report write failed");
            continue;
        }
        metrics.inc_write_count();
    }

    let flushed = sink.flush().await;
    let closed = sink.close().await;
    if let Err(e) = flushed.and(closed) {
        error!(error = %e, "sink shutdown failed");
    }
    debug!(written = metrics.write_count(), "sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use tokio::sync::Notify;
    use tokio::time::{sleep, timeout, Duration};

    /// Records sequences; optionally fails or waits for a go signal per write
    #[derive(Clone)]
    struct RecordingSink {
        name: String,
        written: Arc<parking_lot::Mutex<Vec<u64>>>,
        gate: Option<Arc<Notify>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                written: Arc::default(),
                gate: None,
                fail: false,
            }
        }

        fn gated(name: &str, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(name)
            }
        }

        fn sequences(&self) -> Vec<u64> {
            self.written.lock().clone()
        }
    }

    impl ReportSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, report: &RadarReport) -> Result<(), ContractError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(ContractError::sink_write(&self.name, "refused"));
            }
            self.written.lock().push(report.sequence);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn report(sequence: u64) -> RadarReport {
        RadarReport {
            targets: Vec::new(),
            connected: true,
            timestamp: sequence as f64,
            sequence,
        }
    }

    #[tokio::test]
    async fn test_reports_written_in_order() {
        let sink = RecordingSink::new("ordered");
        let handle = SinkHandle::spawn(sink.clone(), 8, SinkOverflow::Block);

        for sequence in 1..=5 {
            assert_eq!(handle.deliver(report(sequence)).await, Delivery::Queued);
        }
        handle.shutdown().await;

        assert_eq!(sink.sequences(), [1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_block_waits_and_loses_nothing() {
        let gate = Arc::new(Notify::new());
        let sink = RecordingSink::gated("slow", gate.clone());
        let handle = Arc::new(SinkHandle::spawn(sink.clone(), 1, SinkOverflow::Block));

        // The worker holds #1, the queue holds #2, #3 has to wait
        let sender = tokio::spawn({
            let handle = handle.clone();
            async move {
                let mut outcomes = Vec::new();
                for sequence in 1..=3 {
                    outcomes.push(handle.deliver(report(sequence)).await);
                }
                outcomes
            }
        });

        sleep(Duration::from_millis(20)).await;
        assert!(!sender.is_finished());

        let release = tokio::spawn(async move {
            loop {
                gate.notify_one();
                sleep(Duration::from_millis(1)).await;
            }
        });
        let outcomes = timeout(Duration::from_secs(2), sender).await.unwrap().unwrap();
        assert_eq!(outcomes.last(), Some(&Delivery::Waited));

        let handle = Arc::into_inner(handle).unwrap();
        let metrics = handle.metrics().clone();
        handle.shutdown().await;
        release.abort();

        assert_eq!(sink.sequences(), [1, 2, 3]);
        assert_eq!(metrics.dropped_count(), 0);
        assert!(metrics.stalled_count() >= 1);
    }

    #[tokio::test]
    async fn test_drop_newest_counts_dropped_reports() {
        let gate = Arc::new(Notify::new());
        let sink = RecordingSink::gated("lossy", gate.clone());
        let handle = SinkHandle::spawn(sink.clone(), 1, SinkOverflow::DropNewest);

        let mut outcomes = Vec::new();
        for sequence in 1..=6 {
            outcomes.push(handle.deliver(report(sequence)).await);
            sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(outcomes[0], Delivery::Queued);
        assert_eq!(outcomes.last(), Some(&Delivery::Dropped));

        let dropped = outcomes.iter().filter(|d| **d == Delivery::Dropped).count() as u64;
        assert_eq!(handle.metrics().dropped_count(), dropped);
        assert_eq!(handle.metrics().stalled_count(), 0);

        let release = tokio::spawn(async move {
            loop {
                gate.notify_one();
                sleep(Duration::from_millis(1)).await;
            }
        });
        handle.shutdown().await;
        release.abort();

        assert_eq!(sink.sequences().len() as u64 + dropped, 6);
    }

    #[tokio::test]
    async fn test_write_failures_are_isolated() {
        let mut sink = RecordingSink::new("failing");
        sink.fail = true;

        let handle = SinkHandle::spawn(sink, 10, SinkOverflow::Block);
        for sequence in 0..3 {
            handle.deliver(report(sequence)).await;
        }
        let metrics = handle.metrics().clone();
        handle.shutdown().await;

        assert_eq!(metrics.failure_count(), 3);
        assert_eq!(metrics.write_count(), 0);
    }
}
