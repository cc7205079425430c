//! Layered error definitions
//!
//! Categorized by source: config / link / frame / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Link Errors =====
    /// Serial link could not be opened (fatal for the reader)
    #[error("failed to open link '{path}': {message}")]
    LinkOpenFailed { path: String, message: String },

    /// Read on an open link failed (fatal for the current connection)
    #[error("link read failed: {message}")]
    LinkReadFailed { message: String },

    /// Operation requires a connected link
    #[error("link is not connected")]
    LinkNotConnected,

    // ===== Frame Errors =====
    /// A candidate frame could not be decoded (dropped, never surfaced to consumers)
    #[error("malformed frame ({len} bytes): {reason}")]
    FrameMalformed { len: usize, reason: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create link open error
    pub fn link_open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LinkOpenFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create link read error
    pub fn link_read(message: impl Into<String>) -> Self {
        Self::LinkReadFailed {
            message: message.into(),
        }
    }

    /// Create malformed frame error
    pub fn frame_malformed(len: usize, reason: impl Into<String>) -> Self {
        Self::FrameMalformed {
            len,
            reason: reason.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code, used in responses to remote callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } => "ConfigParse",
            Self::ConfigValidation { .. } => "ConfigValidation",
            Self::LinkOpenFailed { .. } => "LinkOpenFailed",
            Self::LinkReadFailed { .. } => "LinkReadFailed",
            Self::LinkNotConnected => "LinkNotConnected",
            Self::FrameMalformed { .. } => "FrameMalformed",
            Self::SinkWrite { .. } => "SinkWrite",
            Self::Io(_) => "Io",
            Self::Other(_) => "Other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ContractError::link_open("/dev/ttyAMA0", "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to open link '/dev/ttyAMA0': permission denied"
        );

        let err = ContractError::frame_malformed(7, "tail missing");
        assert_eq!(err.to_string(), "malformed frame (7 bytes): tail missing");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ContractError::LinkNotConnected.code(), "LinkNotConnected");
        assert_eq!(ContractError::link_read("eof").code(), "LinkReadFailed");
    }
}
