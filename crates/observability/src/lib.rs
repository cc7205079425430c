//! # Observability
//!
//! 日志与指标：
//!
//! - `tracing` 订阅器 (JSON / Pretty / Compact)。默认过滤器只放开本工作区的
//!   crate，串口驱动等依赖保持在 `warn`；`RUST_LOG` 优先。
//! - Prometheus 导出器，附带 `radar_link_*` 指标描述
//! - 订阅侧的报告统计 ([`ReportMetricsAggregator`])
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig::for_level("debug"))?;
//! observability::init_metrics_only(9000)?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    describe_metrics, record_queue_depth, record_report_latency_ms, record_sink_totals,
    MetricsSummary, ReportMetricsAggregator, RunningStats, StatsSummary,
};

/// Crates whose events follow the requested level
const WORKSPACE_TARGETS: [&str; 8] = [
    "contracts",
    "config_loader",
    "protocol",
    "ingestion",
    "dispatcher",
    "control",
    "observability",
    "radar_link_cli",
];

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 本工作区 crate 的日志级别
    pub default_log_level: String,
}

impl ObservabilityConfig {
    /// Human-readable logs at `level`, no metrics endpoint
    pub fn for_level(level: &str) -> Self {
        Self {
            log_format: LogFormat::Compact,
            metrics_port: None,
            default_log_level: level.to_string(),
        }
    }

    /// Filter used when `RUST_LOG` is not set
    pub fn filter_directives(&self) -> String {
        let mut directives = vec!["warn".to_string()];
        directives.extend(
            WORKSPACE_TARGETS
                .iter()
                .map(|target| format!("{target}={}", self.default_log_level)),
        );
        directives.join(",")
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志，带线程名 (`link-reader` 与 tokio worker 可区分)
    #[default]
    Json,
    Pretty,
    Compact,
}

/// 初始化日志，按需安装 Prometheus 导出器
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_thread_names(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "observability initialized"
    );
    Ok(())
}

/// 仅安装 Prometheus 导出器（日志已初始化时使用）
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {port}"))?;

    describe_metrics();
    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
