//! Control channel errors

use std::time::Duration;

use protocol::Command;
use thiserror::Error;

/// Control channel error
#[derive(Debug, Error)]
pub enum ControlError {
    /// The link is not connected; nothing was written
    #[error("link is not connected")]
    LinkNotConnected,

    /// Writing the command frame failed
    #[error("failed to write {command:?} command: {source}")]
    CommandWriteFailed {
        command: Command,
        #[source]
        source: std::io::Error,
    },

    /// Reading the reply failed
    #[error("failed to read reply to {command:?}: {source}")]
    ReplyReadFailed {
        command: Command,
        #[source]
        source: std::io::Error,
    },

    /// No complete ack within the timeout
    #[error("no ack for {command:?} within {waited:?}")]
    AckTimeout { command: Command, waited: Duration },

    /// The blocking exchange was cancelled before it finished
    #[error("control exchange interrupted")]
    Interrupted,
}

impl ControlError {
    /// Stable code sent to remote callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::LinkNotConnected => "LinkNotConnected",
            Self::CommandWriteFailed { .. } => "CommandWriteFailed",
            Self::ReplyReadFailed { .. } => "ReplyReadFailed",
            Self::AckTimeout { .. } => "AckTimeout",
            Self::Interrupted => "Interrupted",
        }
    }

    /// Metric label
    pub(crate) fn status_label(&self) -> &'static str {
        match self {
            Self::LinkNotConnected => "not_connected",
            Self::CommandWriteFailed { .. } => "write_failed",
            Self::ReplyReadFailed { .. } => "read_failed",
            Self::AckTimeout { .. } => "timeout",
            Self::Interrupted => "interrupted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_messages() {
        let err = ControlError::AckTimeout {
            command: Command::MultiTargetTracking,
            waited: Duration::from_millis(500),
        };
        assert_eq!(err.code(), "AckTimeout");
        assert_eq!(
            err.to_string(),
            "no ack for MultiTargetTracking within 500ms"
        );
        assert_eq!(ControlError::LinkNotConnected.code(), "LinkNotConnected");
    }
}
