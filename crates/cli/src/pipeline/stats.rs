//! Pipeline statistics and metrics.

use std::time::Duration;

use control::TrackingResponse;
use dispatcher::DispatchSnapshot;
use observability::ReportMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Reports received from the bus
    pub reports_received: u64,

    /// Reports the summary subscriber missed because it fell behind
    pub reports_lagged: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of configured sinks
    pub active_sinks: usize,

    /// Link reader counters at shutdown
    pub ingestion: ingestion::MetricsSnapshot,

    /// Dispatch loop counters at shutdown
    pub dispatch: DispatchSnapshot,

    /// Reply to the start-up tracking command, if one was sent
    pub tracking: Option<TrackingResponse>,

    /// Set when the reader thread ended on a link fault
    pub reader_fault: Option<String>,

    /// Report content aggregator
    pub report_metrics: ReportMetricsAggregator,
}

impl PipelineStats {
    /// Reports per second over the whole run
    pub fn reports_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.reports_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of candidate frames lost to queue overflow or decode failure, in percent
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.ingestion.frames_dropped + self.dispatch.frames_rejected;
        let total = self.ingestion.frames_received + self.ingestion.frames_dropped;
        if total > 0 {
            (dropped as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Radar Link Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Reports received: {}", self.reports_received);
        println!("   ├─ Reports/s: {:.2}", self.reports_per_sec());
        println!("   ├─ Reports missed by summary: {}", self.reports_lagged);
        println!("   └─ Active sinks: {}", self.active_sinks);

        println!("\n🔌 Link");
        println!("   ├─ Bytes read: {}", self.ingestion.bytes_read);
        println!("   ├─ Candidate frames: {}", self.ingestion.frames_received);
        println!("   ├─ Dropped (queue full): {}", self.ingestion.frames_dropped);
        println!("   ├─ Overflowed accumulations: {}", self.ingestion.overflows);
        println!("   ├─ Rejected frames: {}", self.dispatch.frames_rejected);
        println!("   ├─ Drop rate: {:.2}%", self.drop_rate());
        match &self.reader_fault {
            Some(fault) => println!("   └─ Reader fault: {}", fault),
            None => println!("   └─ Reader fault: none"),
        }

        if let Some(ref tracking) = self.tracking {
            println!("\n🎯 Tracking");
            match (tracking.success, &tracking.error) {
                (true, _) => println!("   └─ Set to {:?}", tracking.enabled),
                (false, Some(error)) => println!("   └─ Failed: {}", error),
                (false, None) => println!("   └─ Rejected by sensor"),
            }
        }

        let summary = self.report_metrics.summary();

        println!("\n📈 Reports");
        println!(
            "   ├─ Empty reports: {} ({:.2}%)",
            summary.empty_reports, summary.empty_rate
        );
        println!("   ├─ Targets per report: {}", summary.targets_per_report);
        println!("   ├─ Range (mm): {}", summary.range_mm);
        println!("   ├─ Speed (cm/s): {}", summary.speed_cm_s);
        println!("   ├─ Interval (ms): {}", summary.interval_ms);
        println!(
            "   └─ Slot occupancy: {} / {} / {}",
            summary.slot_occupancy[0], summary.slot_occupancy[1], summary.slot_occupancy[2]
        );

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut stats = PipelineStats {
            reports_received: 20,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(stats.reports_per_sec(), 10.0);
        assert_eq!(stats.drop_rate(), 0.0);

        stats.ingestion.frames_received = 18;
        stats.ingestion.frames_dropped = 2;
        stats.dispatch.frames_rejected = 3;
        assert_eq!(stats.drop_rate(), 25.0);
    }

    #[test]
    fn test_zero_duration() {
        assert_eq!(PipelineStats::default().reports_per_sec(), 0.0);
    }
}
