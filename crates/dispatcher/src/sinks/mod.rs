//! Sink implementations
//!
//! Contains LogSink and BroadcastSink.

mod broadcast;
mod log;

pub use self::broadcast::{BroadcastSink, ReportBus};
pub use self::log::LogSink;
