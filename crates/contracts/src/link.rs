//! LinkState - Link Reader output
//!
//! Process-wide connection status of the serial link.

use serde::{Deserialize, Serialize};

/// Connection status of the physical link
///
/// Lifecycle: starts `Disconnected`, becomes `Connected` once the port opens,
/// reverts to `Disconnected` on any read failure. Only the link reader writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
}

impl LinkState {
    /// Whether the link is usable
    #[inline]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl From<bool> for LinkState {
    fn from(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}
