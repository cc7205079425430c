//! Request / response messages of the control surface

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Inbound tracking request; `enable` defaults to true
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRequest {
    #[serde(default = "default_enable")]
    pub enable: bool,
}

fn default_enable() -> bool {
    true
}

impl Default for TrackingRequest {
    fn default() -> Self {
        Self { enable: true }
    }
}

/// Reply to a tracking request
///
/// `{"success": bool, "enabled": bool}` when the exchange completed,
/// `{"success": false, "error": "<code>"}` when it did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrackingResponse {
    pub fn from_result(enable: bool, result: &Result<bool, ControlError>) -> Self {
        match result {
            Ok(acked) => Self {
                success: *acked,
                enabled: Some(enable),
                error: None,
            },
            Err(e) => Self {
                success: false,
                enabled: None,
                error: Some(e.code().to_string()),
            },
        }
    }
}

/// Connection status pushed to a newly attached client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub connected: bool,
}
