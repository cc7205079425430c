//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{request_tracking, spawn_reader, Pipeline, PipelineConfig};
pub use stats::PipelineStats;
