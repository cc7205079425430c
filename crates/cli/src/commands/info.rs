//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::RadarBlueprint;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    link: LinkInfo,
    pipeline: PipelineInfo,
    control: ControlInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct LinkInfo {
    path: String,
    baud_rate: u32,
    read_timeout_ms: u64,
    read_chunk: usize,
}

#[derive(Serialize)]
struct PipelineInfo {
    queue_capacity: usize,
    drop_policy: String,
    max_frame_len: usize,
}

#[derive(Serialize)]
struct ControlInfo {
    ack_timeout_ms: u64,
    use_config_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracking_on_start: Option<bool>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &RadarBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        link: LinkInfo {
            path: blueprint.link.path.clone(),
            baud_rate: blueprint.link.baud_rate,
            read_timeout_ms: blueprint.link.read_timeout_ms,
            read_chunk: blueprint.link.read_chunk,
        },
        pipeline: PipelineInfo {
            queue_capacity: blueprint.pipeline.queue_capacity,
            drop_policy: format!("{:?}", blueprint.pipeline.drop_policy),
            max_frame_len: blueprint.pipeline.max_frame_len,
        },
        control: ControlInfo {
            ack_timeout_ms: blueprint.control.ack_timeout_ms,
            use_config_mode: blueprint.control.use_config_mode,
            tracking_on_start: blueprint.control.tracking_on_start,
        },
        sinks,
    }
}

fn print_config_info(blueprint: &RadarBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                Radar Link Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let link = &blueprint.link;
    println!("📡 Link");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Port: {}", link.path);
    println!("   ├─ Baud rate: {}", link.baud_rate);
    println!("   ├─ Read timeout: {} ms", link.read_timeout_ms);
    println!("   └─ Read chunk: {} bytes", link.read_chunk);

    let pipeline = &blueprint.pipeline;
    println!("\n⚙️  Pipeline");
    println!("   ├─ Queue capacity: {}", pipeline.queue_capacity);
    println!("   ├─ Drop policy: {:?}", pipeline.drop_policy);
    println!("   └─ Max frame length: {} bytes", pipeline.max_frame_len);

    let control = &blueprint.control;
    println!("\n🎛  Control");
    println!("   ├─ Ack timeout: {} ms", control.ack_timeout_ms);
    println!("   ├─ Config mode wrap: {}", control.use_config_mode);
    match control.tracking_on_start {
        Some(enable) => println!("   └─ Tracking on start: {}", enable),
        None => println!("   └─ Tracking on start: (unchanged)"),
    }

    if blueprint.sinks.is_empty() {
        println!("\n📤 Sinks: none");
    } else if args.sinks {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    } else {
        println!("\n📤 Sinks: {}", blueprint.sinks.len());
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_info_json_hides_sinks_unless_asked() {
        let blueprint = RadarBlueprint::default();
        let mut args = InfoArgs {
            config: PathBuf::from("radar.toml"),
            json: true,
            sinks: false,
        };

        let json = serde_json::to_value(build_config_info(&blueprint, &args)).unwrap();
        assert!(json.get("sinks").is_none());
        assert_eq!(json["link"]["baud_rate"], 256_000);
        assert_eq!(json["pipeline"]["drop_policy"], "DropOldest");

        args.sinks = true;
        let json = serde_json::to_value(build_config_info(&blueprint, &args)).unwrap();
        assert_eq!(json["sinks"][0]["name"], "reports");
    }
}
