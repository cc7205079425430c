//! `track` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use contracts::RadarBlueprint;
use control::{ControlChannel, ControlSettings, TrackingResponse};
use ingestion::{LinkOpener, ReaderExit, SerialOpener};
use tracing::{debug, info};

use super::{apply_link_overrides, load_blueprint};
use crate::cli::TrackArgs;
use crate::error::CliError;
use crate::pipeline::{request_tracking, spawn_reader};

/// Execute the `track` command
pub async fn run_track(args: &TrackArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.config)?;
    apply_link_overrides(&mut blueprint, &args.link);

    let enable = args.requested();
    let opener = SerialOpener::new(blueprint.link.clone());
    let endpoint = opener.endpoint();
    info!(endpoint = %endpoint, enable, "Sending tracking command");

    let (response, connected) = send_tracking(
        opener,
        &blueprint,
        enable,
        Duration::from_millis(args.connect_timeout_ms),
    )
    .await?;

    if args.json {
        let json = serde_json::to_string_pretty(&response)
            .context("Failed to serialize tracking response")?;
        println!("{}", json);
    } else if response.success {
        let mode = if enable { "multi-target" } else { "single-target" };
        println!("✓ Radar switched to {} tracking", mode);
    } else {
        println!(
            "✗ Tracking command failed: {}",
            response.error.as_deref().unwrap_or("rejected by sensor")
        );
    }

    check_outcome(&response, connected, enable, &endpoint)
}

/// Open the link, send one tracking command, close the link
///
/// Returns the response and whether the link ever connected.
async fn send_tracking<O: LinkOpener>(
    opener: O,
    blueprint: &RadarBlueprint,
    enable: bool,
    connect_timeout: Duration,
) -> Result<(TrackingResponse, bool)> {
    // The queue receiver must stay alive or the reader stops on its first frame
    let (reader, _frame_rx, _) = spawn_reader(opener, blueprint)?;
    let state = reader.state();
    let control = ControlChannel::new(
        reader.link(),
        state.clone(),
        ControlSettings::from(&blueprint.control),
    );

    let response = request_tracking(&control, &state, enable, connect_timeout).await;
    let connected = response.success || state.is_connected();

    let exit = tokio::task::spawn_blocking(move || reader.shutdown())
        .await
        .unwrap_or(ReaderExit::Panicked);
    debug!(exit = ?exit, "Link reader stopped");

    Ok((response, connected))
}

fn check_outcome(
    response: &TrackingResponse,
    connected: bool,
    enable: bool,
    endpoint: &str,
) -> Result<()> {
    if response.success {
        return Ok(());
    }
    if !connected {
        return Err(CliError::link_unavailable(endpoint).into());
    }
    let message = response
        .error
        .clone()
        .unwrap_or_else(|| "rejected by sensor".to_string());
    Err(CliError::tracking_failed(enable, message).into())
}
