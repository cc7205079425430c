//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// The link never reached the connected state
    #[error("Radar link {endpoint} is not connected")]
    LinkUnavailable { endpoint: String },

    /// The sensor answered a tracking command with a failure, or not at all
    #[error("Tracking command (enable={enable}) failed: {message}")]
    TrackingFailed { enable: bool, message: String },

    /// The link reader ended on a fault
    #[error("Link reader failed: {message}")]
    ReaderFault { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn link_unavailable(endpoint: impl Into<String>) -> Self {
        Self::LinkUnavailable {
            endpoint: endpoint.into(),
        }
    }

    pub fn tracking_failed(enable: bool, message: impl Into<String>) -> Self {
        Self::TrackingFailed {
            enable,
            message: message.into(),
        }
    }

    pub fn reader_fault(message: impl Into<String>) -> Self {
        Self::ReaderFault {
            message: message.into(),
        }
    }
}
