//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Radar Link - serial-link bridge for the HLK-LD2450 presence radar
#[derive(Parser, Debug)]
#[command(
    name = "radar-link",
    author,
    version,
    about = "HLK-LD2450 radar serial-link bridge",
    long_about = "Reads target reports from an HLK-LD2450 radar over a serial link.\n\n\
                  Frames the byte stream, decodes up to three targets per report, \n\
                  publishes reports to configured sinks and switches tracking mode."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RADAR_LINK_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RADAR_LINK_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read reports from the radar until stopped
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Switch the radar between multi- and single-target tracking
    Track(TrackArgs),
}

/// Serial link overrides shared by commands that open the port
#[derive(Args, Debug, Clone, Default)]
pub struct LinkOverrides {
    /// Override serial device path from configuration
    #[arg(long, env = "RADAR_LINK_PORT")]
    pub port: Option<String>,

    /// Override baud rate from configuration
    #[arg(long, env = "RADAR_LINK_BAUD")]
    pub baud: Option<u32>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "radar.toml", env = "RADAR_LINK_CONFIG")]
    pub config: PathBuf,

    #[command(flatten)]
    pub link: LinkOverrides,

    /// Stop after this many reports (0 = unlimited)
    #[arg(long, default_value = "0", env = "RADAR_LINK_MAX_REPORTS")]
    pub max_reports: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "RADAR_LINK_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without opening the link
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "RADAR_LINK_METRICS_PORT")]
    pub metrics_port: u16,

    /// Tracking mode to set once connected (overrides control.tracking_on_start)
    #[arg(long, value_enum)]
    pub tracking: Option<TrackingMode>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "radar.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "radar.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `track` command
#[derive(Parser, Debug, Clone)]
pub struct TrackArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "radar.toml", env = "RADAR_LINK_CONFIG")]
    pub config: PathBuf,

    #[command(flatten)]
    pub link: LinkOverrides,

    /// Enable multi-target tracking
    #[arg(long, conflicts_with = "disable", required_unless_present = "disable")]
    pub enable: bool,

    /// Fall back to single-target tracking
    #[arg(long)]
    pub disable: bool,

    /// How long to wait for the port to open, in milliseconds
    #[arg(long, default_value = "2000")]
    pub connect_timeout_ms: u64,

    /// Output the response as JSON
    #[arg(long)]
    pub json: bool,
}

impl TrackArgs {
    /// Requested tracking state
    pub fn requested(&self) -> bool {
        self.enable && !self.disable
    }
}

/// Tracking mode selector
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingMode {
    /// Multi-target tracking
    On,
    /// Single-target tracking
    Off,
}

impl From<TrackingMode> for bool {
    fn from(mode: TrackingMode) -> Self {
        matches!(mode, TrackingMode::On)
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
