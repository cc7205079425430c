//! Dispatcher - dispatch loop: screen, decode, assemble, fan out to sinks

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace};

use contracts::{
    ContractError, LinkState, RadarReport, SinkConfig, SinkType, TargetMeasurement, MAX_TARGETS,
};
use ingestion::{FrameReceiver, LinkStateHandle};
use protocol::FrameFault;

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::{DispatchMetrics, DispatchSnapshot, MetricsSnapshot, SinkMetrics};
use crate::sinks::{BroadcastSink, LogSink, ReportBus};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Why a candidate frame produced no report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRejection {
    /// Header or tail marker absent
    NoMarkers,
    /// Markers present but the codec rejected the frame
    Malformed(FrameFault),
}

impl FrameRejection {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoMarkers => "no_markers",
            Self::Malformed(fault) => fault.as_str(),
        }
    }

    pub fn into_error(self, len: usize) -> ContractError {
        match self {
            Self::NoMarkers => ContractError::frame_malformed(len, "frame markers missing"),
            Self::Malformed(fault) => ContractError::frame_malformed(len, fault.to_string()),
        }
    }
}

/// Build a report from decoded slots, keeping only occupied slots
///
/// Slot ids are preserved, so a gap (e.g. `[1, 3]`) stays visible.
pub fn assemble_report(
    slots: &[TargetMeasurement; MAX_TARGETS],
    state: LinkState,
    timestamp: f64,
    sequence: u64,
) -> RadarReport {
    RadarReport {
        targets: slots.iter().copied().filter(|t| t.is_present()).collect(),
        connected: state.is_connected(),
        timestamp,
        sequence,
    }
}

/// Screen and decode one candidate frame into a report
pub fn decode_report(
    frame: &[u8],
    state: LinkState,
    timestamp: f64,
    sequence: u64,
) -> Result<RadarReport, FrameRejection> {
    if !protocol::contains_markers(frame) {
        return Err(FrameRejection::NoMarkers);
    }
    let slots = protocol::decode_frame(frame).map_err(FrameRejection::Malformed)?;
    Ok(assemble_report(&slots, state, timestamp, sequence))
}

/// Wall-clock capture time in unix seconds
pub fn capture_timestamp() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: FrameReceiver,
    state: LinkStateHandle,
    bus: Option<ReportBus>,
    extra: Vec<SinkHandle>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig, input_rx: FrameReceiver, state: LinkStateHandle) -> Self {
        Self {
            config,
            input_rx,
            state,
            bus: None,
            extra: Vec::new(),
        }
    }

    /// Publish broadcast sinks on this bus instead of a fresh one
    pub fn with_bus(mut self, bus: ReportBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Add a sink supplied by the embedding application
    pub fn with_handle(mut self, handle: SinkHandle) -> Self {
        self.extra.push(handle);
        self
    }

    /// Build and start the sink workers
    #[instrument(name = "dispatcher_builder_build", skip(self), fields(sink_count = self.config.sinks.len()))]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut names = HashSet::new();
        let extra_names = self.extra.iter().map(|h| h.name());
        for name in self.config.sinks.iter().map(|c| c.name.as_str()).chain(extra_names) {
            if !names.insert(name.to_string()) {
                return Err(DispatcherError::duplicate_sink(name));
            }
        }

        let bus = self.bus.unwrap_or_default();
        let mut handles: Vec<SinkHandle> = self
            .config
            .sinks
            .iter()
            .map(|config| create_sink_handle(config, &bus))
            .collect();
        handles.extend(self.extra);

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
            state: self.state,
            bus,
            metrics: Arc::new(DispatchMetrics::new()),
            next_sequence: 1,
        })
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config, bus),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig, bus: &ReportBus) -> SinkHandle {
    let capacity = config.queue_capacity;
    match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), capacity, config.overflow),
        SinkType::Broadcast => SinkHandle::spawn(
            BroadcastSink::new(&config.name, bus.clone()),
            capacity,
            config.overflow,
        ),
    }
}

/// The dispatch loop: turns candidate frames into reports and fans them out
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: FrameReceiver,
    state: LinkStateHandle,
    bus: ReportBus,
    metrics: Arc<DispatchMetrics>,
    next_sequence: u64,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: FrameReceiver,
        state: LinkStateHandle,
    ) -> Self {
        Self {
            handles,
            input_rx,
            state,
            bus: ReportBus::default(),
            metrics: Arc::new(DispatchMetrics::new()),
            next_sequence: 1,
        }
    }

    /// Bus carrying reports of every broadcast sink
    pub fn bus(&self) -> ReportBus {
        self.bus.clone()
    }

    /// Dispatch loop counters
    pub fn dispatch_metrics(&self) -> Arc<DispatchMetrics> {
        self.metrics.clone()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Live metric handles per sink, still readable after `spawn`
    pub fn sink_metrics(&self) -> Vec<(String, Arc<SinkMetrics>)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().clone()))
            .collect()
    }

    /// Run the dispatch loop
    ///
    /// Waits on the frame queue and handles frames in arrival order.
    /// Returns once the queue is closed and drained.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> DispatchSnapshot {
        info!(sinks = self.handles.len(), "Dispatcher started");

        while let Ok(frame) = self.input_rx.recv().await {
            self.metrics.inc_frames_received();
            self.handle_frame(frame.as_bytes()).await;

            let received = self.metrics.snapshot().frames_received;
            if received.is_multiple_of(100) {
                debug!(frames = received, "Dispatcher progress");
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            frames = snapshot.frames_received,
            reports = snapshot.reports_published,
            rejected = snapshot.frames_rejected,
            "Dispatcher input closed, shutting down"
        );

        Self::shutdown_handles(self.handles).await;

        info!("Dispatcher shutdown complete");
        snapshot
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<DispatchSnapshot> {
        tokio::spawn(self.run())
    }

    async fn handle_frame(&mut self, frame: &[u8]) {
        let state = self.state.get();
        match decode_report(frame, state, capture_timestamp(), self.next_sequence) {
            Ok(report) => {
                self.next_sequence += 1;
                self.metrics.record_published(report.target_count());
                counter!("radar_link_reports_published_total").increment(1);
                histogram!("radar_link_targets_per_report").record(report.target_count() as f64);
                self.dispatch_report(report).await;
            }
            Err(rejection) => {
                self.metrics.inc_frames_rejected();
                counter!("radar_link_frames_dropped_total", "reason" => rejection.as_str())
                    .increment(1);
                trace!(error = %rejection.into_error(frame.len()), "frame discarded");
            }
        }
    }

    /// Hand the report to every sink in turn; a `Block` sink may hold the loop
    async fn dispatch_report(&self, report: RadarReport) {
        if let Some((last, rest)) = self.handles.split_last() {
            for handle in rest {
                handle.deliver(report.clone()).await;
            }
            last.deliver(report).await;
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) {
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx, state))]
pub fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: FrameReceiver,
    state: LinkStateHandle,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx, state).build()
}
