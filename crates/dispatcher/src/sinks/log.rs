//! LogSink - logs report summary via tracing

use contracts::{ContractError, RadarReport, ReportSink};
use tracing::{debug, info, instrument};

/// Sink that logs report summaries for debugging
pub struct LogSink {
    name: String,
    written: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            written: 0,
        }
    }

    fn log_report_summary(&self, report: &RadarReport) {
        info!(
            sink = %self.name,
            sequence = report.sequence,
            timestamp = report.timestamp,
            connected = report.connected,
            targets = report.target_count(),
            slots = ?report.slot_ids(),
            "RadarReport received"
        );

        for target in &report.targets {
            debug!(
                sink = %self.name,
                slot = target.slot,
                x = target.x,
                y = target.y,
                speed = target.speed,
                distance_res = target.distance_resolution,
                "target"
            );
        }
    }
}

impl ReportSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, report),
        fields(sink = %self.name, sequence = report.sequence)
    )]
    async fn write(&mut self, report: &RadarReport) -> Result<(), ContractError> {
        self.log_report_summary(report);
        self.written += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, reports = self.written, "LogSink closed");
        Ok(())
    }
}
