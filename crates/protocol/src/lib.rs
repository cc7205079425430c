//! # Protocol
//!
//! Byte-level wire format of the HLK-LD2450 multi-target radar.
//!
//! Responsibilities:
//! - Decode 30-byte report frames into three target slots
//! - Split a continuous byte stream into candidate frames on the tail marker
//! - Build command frames and decode the sensor's ack frames
//!
//! ## Report frame (radar -> host)
//!
//! ```text
//! AA FF 03 00 | slot1 (8) | slot2 (8) | slot3 (8) | 55 CC
//! slot = x:u16 LE | y:u16 LE | speed:u16 LE | distance_resolution:u16 LE
//! ```
//!
//! `x`, `y` and `speed` are sign-and-magnitude with bit 15 set for positive values.
//!
//! ## Command / ack frame (host <-> radar)
//!
//! ```text
//! FD FC FB FA | len:u16 LE | word:u16 LE | value... | 04 03 02 01
//! ```
//!
//! Ack word is the command word with bit 8 set, followed by a `u16` status (0 = success).
//!
//! Everything here is pure: no I/O, no logging, no per-field allocation.

mod command;
mod delimiter;
mod report;

pub use command::{
    ack_for, acks, decode_ack, encode_command, encode_tracking_command, parse_ack, Ack, AckFrames,
    Command, ACK_FLAG, CMD_HEADER, CMD_TAIL,
};
pub use delimiter::FrameDelimiter;
pub use report::{
    contains_markers, decode, decode_frame, encode, FrameFault, FRAME_LEN, PAYLOAD_LEN,
    REPORT_HEADER, REPORT_TAIL, SLOT_LEN,
};

/// Position of `needle` in `haystack`, if any
#[inline]
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
