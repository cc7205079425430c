//! # Control
//!
//! Tracking-mode control of the radar.
//!
//! Commands go straight to the shared link, bypassing the report queue and the
//! dispatch loop. A command is only sent while the link is connected.

mod channel;
mod error;
mod response;

pub use channel::{ControlChannel, ControlSettings};
pub use error::ControlError;
pub use protocol::Command;
pub use response::{LinkStatus, TrackingRequest, TrackingResponse};
