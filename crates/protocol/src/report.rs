//! Report frame codec

use contracts::{TargetMeasurement, MAX_TARGETS};
use thiserror::Error;

use crate::find;

/// Report frame header
pub const REPORT_HEADER: [u8; 4] = [0xAA, 0xFF, 0x03, 0x00];

/// Report frame tail
pub const REPORT_TAIL: [u8; 2] = [0x55, 0xCC];

/// Bytes per target slot
pub const SLOT_LEN: usize = 8;

/// Bytes between header and tail
pub const PAYLOAD_LEN: usize = SLOT_LEN * MAX_TARGETS;

/// Bytes in a complete report frame
pub const FRAME_LEN: usize = REPORT_HEADER.len() + PAYLOAD_LEN + REPORT_TAIL.len();

const SIGN_BIT: u16 = 0x8000;
const MAGNITUDE_MASK: u16 = 0x7FFF;

/// Reason a candidate frame was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameFault {
    /// No header anywhere in the buffer
    #[error("header marker not found")]
    MissingHeader,

    /// No tail at the end of the payload
    #[error("tail marker not found after payload")]
    MissingTail,

    /// The buffer ends before a whole payload and tail
    #[error("payload truncated: {available} of {PAYLOAD_LEN} bytes")]
    Truncated { available: usize },
}

impl FrameFault {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::MissingTail => "missing_tail",
            Self::Truncated { .. } => "truncated",
        }
    }
}

/// Whether the buffer carries both report markers
pub fn contains_markers(buffer: &[u8]) -> bool {
    find(buffer, &REPORT_HEADER).is_some() && find(buffer, &REPORT_TAIL).is_some()
}

/// Decode a report frame, always yielding three slots (empty slots zeroed)
///
/// Returns `None` for anything [`decode_frame`] rejects.
#[inline]
pub fn decode(buffer: &[u8]) -> Option<[TargetMeasurement; MAX_TARGETS]> {
    decode_frame(buffer).ok()
}

/// Decode a report frame, reporting why it was rejected
///
/// The first header in the buffer anchors the frame. The payload is the 24
/// bytes right after it and the tail must follow immediately; a tail marker
/// anywhere else does not end the frame. Leading garbage before the header is
/// ignored.
pub fn decode_frame(buffer: &[u8]) -> Result<[TargetMeasurement; MAX_TARGETS], FrameFault> {
    let header_at = find(buffer, &REPORT_HEADER).ok_or(FrameFault::MissingHeader)?;
    let payload_start = header_at + REPORT_HEADER.len();
    let payload_end = payload_start + PAYLOAD_LEN;

    match buffer.get(payload_end..payload_end + REPORT_TAIL.len()) {
        Some(tail) if tail == REPORT_TAIL => {}
        Some(_) => return Err(FrameFault::MissingTail),
        None => {
            // Short buffer: a tail inside it means the sender cut the payload
            return Err(match find(&buffer[payload_start..], &REPORT_TAIL) {
                Some(available) => FrameFault::Truncated { available },
                None => FrameFault::MissingTail,
            });
        }
    }

    let payload = &buffer[payload_start..payload_end];
    Ok(std::array::from_fn(|i| {
        decode_slot(i as u8 + 1, &payload[i * SLOT_LEN..(i + 1) * SLOT_LEN])
    }))
}

/// Encode three slots into a complete frame
///
/// Slot ids in the input are ignored; position decides the slot.
pub fn encode(targets: &[TargetMeasurement; MAX_TARGETS]) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[..REPORT_HEADER.len()].copy_from_slice(&REPORT_HEADER);

    for (i, target) in targets.iter().enumerate() {
        let start = REPORT_HEADER.len() + i * SLOT_LEN;
        let slot = &mut frame[start..start + SLOT_LEN];
        slot[0..2].copy_from_slice(&encode_signed(target.x).to_le_bytes());
        slot[2..4].copy_from_slice(&encode_signed(target.y).to_le_bytes());
        slot[4..6].copy_from_slice(&encode_signed(target.speed).to_le_bytes());
        slot[6..8].copy_from_slice(&target.distance_resolution.to_le_bytes());
    }

    frame[FRAME_LEN - REPORT_TAIL.len()..].copy_from_slice(&REPORT_TAIL);
    frame
}

#[inline]
fn decode_slot(slot: u8, bytes: &[u8]) -> TargetMeasurement {
    TargetMeasurement {
        slot,
        x: decode_signed(read_u16(bytes, 0)),
        y: decode_signed(read_u16(bytes, 2)),
        speed: decode_signed(read_u16(bytes, 4)),
        distance_resolution: read_u16(bytes, 6),
    }
}

#[inline]
fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

/// Bit 15 set means positive; the low 15 bits are the magnitude
#[inline]
fn decode_signed(raw: u16) -> i16 {
    let magnitude = (raw & MAGNITUDE_MASK) as i16;
    if raw & SIGN_BIT != 0 {
        magnitude
    } else {
        -magnitude
    }
}

/// Zero encodes with the sign bit clear, matching what the sensor sends for empty slots
#[inline]
fn encode_signed(value: i16) -> u16 {
    if value > 0 {
        value as u16 | SIGN_BIT
    } else {
        value.max(-i16::MAX).unsigned_abs()
    }
}
