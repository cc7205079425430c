//! # Dispatcher
//!
//! 报告分发模块。
//!
//! 负责：
//! - 消费 Link Reader 输出的 `RawFrame`
//! - 解码并组装 `RadarReport`（过滤空槽位）
//! - Fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞主链路

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{RadarReport, ReportSink};
pub use dispatcher::{
    assemble_report, capture_timestamp, create_dispatcher, decode_report, Dispatcher,
    DispatcherBuilder, DispatcherConfig, FrameRejection,
};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{DispatchMetrics, DispatchSnapshot, MetricsSnapshot, SinkMetrics};
pub use sinks::{BroadcastSink, LogSink, ReportBus};
