//! Pipeline orchestrator - coordinates all components.
//!
//! Link reader thread -> frame queue -> dispatch loop -> sinks, with the
//! control channel sharing the reader's link. The link opener is a type
//! parameter so the whole pipeline runs against a scripted transport in tests.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{LinkState, RadarBlueprint};
use control::{ControlChannel, ControlSettings, TrackingResponse};
use ingestion::{
    frame_queue, BackpressureConfig, FrameReceiver, IngestionMetrics, LinkOpener, LinkReader,
    LinkStateHandle, ReaderExit, ReaderSettings,
};
use observability::{record_queue_depth, record_report_latency_ms, record_sink_totals};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument, warn};

use super::PipelineStats;

/// How long start-up tracking waits for the port to open
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// How long shutdown waits for the dispatcher to drain
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The radar blueprint configuration
    pub blueprint: RadarBlueprint,

    /// Maximum number of reports to receive (None = unlimited)
    pub max_reports: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Tracking mode to set once connected; falls back to `control.tracking_on_start`
    pub tracking: Option<bool>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, a limit is hit, or the link goes away
    #[instrument(name = "pipeline_run", skip_all, fields(endpoint = %opener.endpoint()))]
    pub async fn run<O, F>(self, opener: O, shutdown: F) -> Result<PipelineStats>
    where
        O: LinkOpener,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Link reader
        let (reader, frame_rx, ingest_metrics) = spawn_reader(opener, blueprint)?;
        let state = reader.state();

        // Dispatcher
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - decoded reports will be dropped");
        }

        let dispatcher =
            dispatcher::create_dispatcher(blueprint.sinks.clone(), frame_rx, state.clone())
                .context("Failed to create dispatcher")?;

        let mut reports = dispatcher.bus().subscribe();
        let dispatch_metrics = dispatcher.dispatch_metrics();
        let sink_metrics = dispatcher.sink_metrics();
        let dispatcher_handle = dispatcher.spawn();

        let mut stats = PipelineStats {
            active_sinks: blueprint.sinks.len(),
            ..Default::default()
        };
        info!(active_sinks = stats.active_sinks, "Dispatcher started");

        // Start-up tracking mode
        let control = ControlChannel::new(
            reader.link(),
            state.clone(),
            ControlSettings::from(&blueprint.control),
        );
        if let Some(enable) = self.config.tracking.or(blueprint.control.tracking_on_start) {
            stats.tracking =
                Some(request_tracking(&control, &state, enable, CONNECT_TIMEOUT).await);
        }

        let max_reports = self.config.max_reports;
        let deadline = self
            .config
            .timeout
            .map(|t| tokio::time::Instant::now() + t);

        info!(max_reports = ?max_reports, timeout = ?self.config.timeout, "Pipeline running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    break;
                }
                _ = sleep_until(deadline) => {
                    warn!(timeout = ?self.config.timeout, "Pipeline timed out");
                    break;
                }
                received = reports.recv() => match received {
                    Ok(report) => {
                        stats.reports_received += 1;
                        stats.report_metrics.update(&report);
                        record_report_latency_ms(
                            (dispatcher::capture_timestamp() - report.timestamp) * 1000.0,
                        );
                        record_queue_depth(ingest_metrics.snapshot().queue_len);

                        debug!(
                            sequence = report.sequence,
                            targets = report.target_count(),
                            slots = ?report.slot_ids(),
                            connected = report.connected,
                            "Report received"
                        );

                        if max_reports.is_some_and(|max| stats.reports_received >= max) {
                            info!(reports = stats.reports_received, "Reached max reports limit");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Summary subscriber lagged behind the report bus");
                        stats.reports_lagged += missed;
                    }
                    Err(RecvError::Closed) => {
                        info!("Report bus closed");
                        break;
                    }
                },
            }
        }

        // Shutdown: reader first so the queue closes and the dispatcher drains
        info!("Shutting down pipeline...");
        drop(reports);

        let reader_exit = tokio::task::spawn_blocking(move || reader.shutdown())
            .await
            .unwrap_or(ReaderExit::Panicked);
        stats.reader_fault = describe_fault(&reader_exit);
        info!(exit = ?reader_exit, "Link reader stopped");

        stats.dispatch = match tokio::time::timeout(DRAIN_TIMEOUT, dispatcher_handle).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                dispatch_metrics.snapshot()
            }
            Err(_) => {
                warn!(timeout = ?DRAIN_TIMEOUT, "Dispatcher did not drain in time");
                dispatch_metrics.snapshot()
            }
        };

        for (name, metrics) in &sink_metrics {
            record_sink_totals(
                name,
                metrics.write_count(),
                metrics.failure_count(),
                metrics.dropped_count(),
            );
        }

        stats.ingestion = ingest_metrics.snapshot();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            reports_per_sec = format!("{:.2}", stats.reports_per_sec()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Create the frame queue and start the link reader on it
pub fn spawn_reader<O: LinkOpener>(
    opener: O,
    blueprint: &RadarBlueprint,
) -> Result<(LinkReader, FrameReceiver, Arc<IngestionMetrics>)> {
    let metrics = Arc::new(IngestionMetrics::new());
    let (tx, rx) = frame_queue(
        &BackpressureConfig::from(&blueprint.pipeline),
        metrics.clone(),
    );
    let settings = ReaderSettings::from_config(&blueprint.link, &blueprint.pipeline);

    let reader = LinkReader::spawn(opener, settings, tx, metrics.clone())
        .context("Failed to spawn link reader")?;
    Ok((reader, rx, metrics))
}

/// Wait for the link, then send one tracking command
pub async fn request_tracking(
    control: &ControlChannel,
    state: &LinkStateHandle,
    enable: bool,
    connect_timeout: Duration,
) -> TrackingResponse {
    if !state.wait_for(LinkState::Connected, connect_timeout).await {
        warn!(timeout = ?connect_timeout, "Link not connected, tracking command will not be sent");
    }

    let response = control.handle_request(enable).await;
    if response.success {
        info!(enable, "Tracking mode set");
    } else {
        warn!(enable, error = ?response.error, "Tracking command failed");
    }
    response
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn describe_fault(exit: &ReaderExit) -> Option<String> {
    match exit {
        ReaderExit::OpenFailed(e) | ReaderExit::ReadFailed(e) => Some(e.to_string()),
        ReaderExit::Panicked => Some("link reader thread panicked".to_string()),
        ReaderExit::Stopped | ReaderExit::ConsumerGone | ReaderExit::LinkClosed => None,
    }
}
