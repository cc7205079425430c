//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Two sinks share a name
    #[error("duplicate sink name '{name}'")]
    DuplicateSink { name: String },
}

impl DispatcherError {
    pub fn duplicate_sink(name: impl Into<String>) -> Self {
        Self::DuplicateSink { name: name.into() }
    }
}
