//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::RadarBlueprint;
use ingestion::SerialOpener;
use std::time::Duration;
use tracing::info;

use super::{apply_link_overrides, load_blueprint};
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;
    apply_link_overrides(&mut blueprint, &args.link);

    info!(
        port = %blueprint.link.path,
        baud = blueprint.link.baud_rate,
        queue_capacity = blueprint.pipeline.queue_capacity,
        drop_policy = ?blueprint.pipeline.drop_policy,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let opener = SerialOpener::new(blueprint.link.clone());
    let pipeline = Pipeline::new(build_pipeline_config(args, blueprint));

    info!("Starting pipeline...");

    let stats = pipeline
        .run(opener, shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    stats.print_summary();

    if let Some(fault) = stats.reader_fault {
        return Err(CliError::reader_fault(fault).into());
    }

    info!("Radar link finished");
    Ok(())
}

fn build_pipeline_config(args: &RunArgs, blueprint: RadarBlueprint) -> PipelineConfig {
    PipelineConfig {
        blueprint,
        max_reports: (args.max_reports > 0).then_some(args.max_reports),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        tracking: args.tracking.map(bool::from),
    }
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that fails to install never fires; the other one still does.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RadarBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Link:");
    println!("  Port: {}", blueprint.link.path);
    println!("  Baud rate: {}", blueprint.link.baud_rate);
    println!("  Read timeout: {} ms", blueprint.link.read_timeout_ms);

    println!("\nPipeline:");
    println!("  Queue capacity: {}", blueprint.pipeline.queue_capacity);
    println!("  Drop policy: {:?}", blueprint.pipeline.drop_policy);

    if let Some(enable) = blueprint.control.tracking_on_start {
        println!("\nControl:");
        println!("  Tracking on start: {}", enable);
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
