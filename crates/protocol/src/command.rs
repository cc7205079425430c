//! Command frames and ack parsing

use crate::find;

/// Command / ack frame header
pub const CMD_HEADER: [u8; 4] = [0xFD, 0xFC, 0xFB, 0xFA];

/// Command / ack frame tail
pub const CMD_TAIL: [u8; 4] = [0x04, 0x03, 0x02, 0x01];

/// Bit the sensor sets on a command word to form its ack word
pub const ACK_FLAG: u16 = 0x0100;

const LEN_FIELD: usize = 2;
const WORD_LEN: usize = 2;
const STATUS_LEN: usize = 2;

/// Commands the host sends to the radar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Enter configuration mode; required before any other command
    EnableConfiguration,
    /// Leave configuration mode and resume reporting
    EndConfiguration,
    /// Track only the strongest target
    SingleTargetTracking,
    /// Track up to three targets
    MultiTargetTracking,
}

impl Command {
    /// Command word
    pub const fn word(self) -> u16 {
        match self {
            Self::EnableConfiguration => 0x00FF,
            Self::EndConfiguration => 0x00FE,
            Self::SingleTargetTracking => 0x0080,
            Self::MultiTargetTracking => 0x0090,
        }
    }

    /// Command value bytes
    pub const fn value(self) -> &'static [u8] {
        match self {
            Self::EnableConfiguration => &[0x01, 0x00],
            _ => &[],
        }
    }

    /// Word the sensor answers with
    #[inline]
    pub const fn ack_word(self) -> u16 {
        self.word() | ACK_FLAG
    }

    /// Tracking command: multi-target when enabled, single-target otherwise
    #[inline]
    pub const fn tracking(enable: bool) -> Self {
        if enable {
            Self::MultiTargetTracking
        } else {
            Self::SingleTargetTracking
        }
    }

    /// Command answered by the given ack word
    pub fn from_ack_word(ack_word: u16) -> Option<Self> {
        [
            Self::EnableConfiguration,
            Self::EndConfiguration,
            Self::SingleTargetTracking,
            Self::MultiTargetTracking,
        ]
        .into_iter()
        .find(|c| c.ack_word() == ack_word)
    }
}

/// Build a complete command frame
pub fn encode_command(command: Command) -> Vec<u8> {
    let value = command.value();
    let len = (WORD_LEN + value.len()) as u16;

    let mut frame =
        Vec::with_capacity(CMD_HEADER.len() + LEN_FIELD + len as usize + CMD_TAIL.len());
    frame.extend_from_slice(&CMD_HEADER);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&command.word().to_le_bytes());
    frame.extend_from_slice(value);
    frame.extend_from_slice(&CMD_TAIL);
    frame
}

/// Frame selecting multi- (`true`) or single-target (`false`) tracking
#[inline]
pub fn encode_tracking_command(enable: bool) -> Vec<u8> {
    encode_command(Command::tracking(enable))
}

/// A well-formed ack frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack<'a> {
    pub ack_word: u16,
    /// 0 = success
    pub status: u16,
    /// Values following the status (protocol version, buffer size, ...)
    pub payload: &'a [u8],
}

impl Ack<'_> {
    /// Command this ack answers
    #[inline]
    pub fn command(&self) -> Option<Command> {
        Command::from_ack_word(self.ack_word)
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Successful answer to exactly this command
    #[inline]
    pub fn is_success_for(&self, command: Command) -> bool {
        self.ack_word == command.ack_word() && self.is_success()
    }
}

/// Iterator over the well-formed ack frames in a reply buffer
///
/// Bytes that are not part of an ack (report traffic, torn frames) are skipped.
#[derive(Debug, Clone)]
pub struct AckFrames<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for AckFrames<'a> {
    type Item = Ack<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let at = find(self.rest, &CMD_HEADER)?;
            let frame = &self.rest[at..];

            match parse_frame_at_start(frame) {
                Some((ack, consumed)) => {
                    self.rest = &frame[consumed..];
                    return Some(ack);
                }
                None => self.rest = &frame[1..],
            }
        }
    }
}

/// Every well-formed ack in `reply`, in order
#[inline]
pub fn acks(reply: &[u8]) -> AckFrames<'_> {
    AckFrames { rest: reply }
}

/// First well-formed ack in `reply`
#[inline]
pub fn parse_ack(reply: &[u8]) -> Option<Ack<'_>> {
    acks(reply).next()
}

/// Whether `reply` carries the sensor's approval of the tracking mode `enable` selects
///
/// Only the ack answering that exact command counts: empty, truncated,
/// tail-less, failure-status and other-command replies all yield `false`.
/// Unrelated bytes before the ack are skipped.
pub fn decode_ack(reply: &[u8], enable: bool) -> bool {
    ack_for(reply, Command::tracking(enable)).is_some_and(|ack| ack.is_success())
}

/// First ack in `reply` answering `command`
pub fn ack_for(reply: &[u8], command: Command) -> Option<Ack<'_>> {
    acks(reply).find(|ack| ack.ack_word == command.ack_word())
}

/// Parse an ack that begins at `frame[0]`, returning it and the bytes it spans
fn parse_frame_at_start(frame: &[u8]) -> Option<(Ack<'_>, usize)> {
    let body_start = CMD_HEADER.len() + LEN_FIELD;
    let len_bytes = frame.get(CMD_HEADER.len()..body_start)?;
    let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
    if len < WORD_LEN + STATUS_LEN {
        return None;
    }

    let body = frame.get(body_start..body_start + len)?;
    let tail_end = body_start + len + CMD_TAIL.len();
    if frame.get(body_start + len..tail_end)? != CMD_TAIL {
        return None;
    }

    let ack = Ack {
        ack_word: u16::from_le_bytes([body[0], body[1]]),
        status: u16::from_le_bytes([body[2], body[3]]),
        payload: &body[WORD_LEN + STATUS_LEN..],
    };
    Some((ack, tail_end))
}
