//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - `RadarReport::timestamp` is wall-clock capture time (unix seconds, f64)
//! - `RadarReport::sequence` is the position in the published stream, used for ordering/diagnostics
//!
//! ## Slot Model
//! - A report frame always carries three slots (1, 2, 3)
//! - Slot identity is positional; it does not survive across frames

mod blueprint;
mod error;
mod link;
mod report;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use link::LinkState;
pub use report::*;
pub use sink::*;
