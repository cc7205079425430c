//! BroadcastSink - outbound report stream for subscribers

use contracts::{ContractError, RadarReport, ReportSink};
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

/// Subscriber bus carrying every published report
///
/// Slow subscribers lag and skip reports; they never hold up the dispatcher.
#[derive(Debug, Clone)]
pub struct ReportBus {
    tx: broadcast::Sender<RadarReport>,
}

impl ReportBus {
    /// Create a bus retaining up to `capacity` reports per lagging subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to reports published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RadarReport> {
        self.tx.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish, returning how many subscribers received it
    pub fn publish(&self, report: RadarReport) -> usize {
        self.tx.send(report).unwrap_or(0)
    }
}

impl Default for ReportBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Sink that publishes reports on a [`ReportBus`]
pub struct BroadcastSink {
    name: String,
    bus: ReportBus,
}

impl BroadcastSink {
    pub fn new(name: impl Into<String>, bus: ReportBus) -> Self {
        Self {
            name: name.into(),
            bus,
        }
    }

    pub fn bus(&self) -> &ReportBus {
        &self.bus
    }
}

impl ReportSink for BroadcastSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "broadcast_sink_write",
        skip(self, report),
        fields(sink = %self.name, sequence = report.sequence)
    )]
    async fn write(&mut self, report: &RadarReport) -> Result<(), ContractError> {
        // No subscribers is not an error: the report simply has no audience
        let delivered = self.bus.publish(report.clone());
        trace!(delivered, "report broadcast");
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(
            sink = %self.name,
            subscribers = self.bus.subscriber_count(),
            "BroadcastSink closed"
        );
        Ok(())
    }
}
