//! Stream framing of report frames

use bytes::{Buf, Bytes, BytesMut};

use crate::find;
use crate::report::{FRAME_LEN, REPORT_HEADER, REPORT_TAIL};

/// Splits a continuous byte stream into candidate frames
///
/// A header followed by a tail exactly one payload later is cut as one frame,
/// so tail bytes inside the payload never end it early. A header without its
/// tail in place (a torn or spliced frame) is handed over up to the next
/// header for the codec to reject. Without any header, bytes are cut at the
/// next tail. Leading garbage stays attached to the candidate it precedes.
/// Accumulations that grow past `max_len` are discarded and counted.
#[derive(Debug)]
pub struct FrameDelimiter {
    buffer: BytesMut,
    /// Bytes already searched without finding a tail (headerless case only)
    scanned: usize,
    max_len: usize,
    overflows: u64,
}

impl FrameDelimiter {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(FRAME_LEN);
        Self {
            buffer: BytesMut::with_capacity(max_len),
            scanned: 0,
            max_len,
            overflows: 0,
        }
    }

    /// Append freshly read bytes
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete candidate, if one is buffered
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let Some(header_at) = find(&self.buffer, &REPORT_HEADER) else {
            return self.cut_at_tail();
        };

        let frame_end = header_at + FRAME_LEN;
        if self.buffer.len() < frame_end {
            if self.buffer.len() > self.max_len {
                self.discard(header_at);
            }
            return None;
        }

        let cut = if self.buffer[frame_end - REPORT_TAIL.len()..frame_end] == REPORT_TAIL {
            frame_end
        } else {
            // Resynchronise on the next header; keep a possibly split one
            match find(&self.buffer[header_at + 1..], &REPORT_HEADER) {
                Some(pos) => header_at + 1 + pos,
                None => self.buffer.len() - (REPORT_HEADER.len() - 1),
            }
        };
        Some(self.split(cut))
    }

    /// Drain every complete candidate currently buffered
    pub fn drain(&mut self) -> impl Iterator<Item = Bytes> + '_ {
        std::iter::from_fn(move || self.next_frame())
    }

    /// Bytes waiting to form a candidate
    #[inline]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Accumulations discarded for exceeding `max_len`
    #[inline]
    pub fn overflow_count(&self) -> u64 {
        self.overflows
    }

    /// Drop buffered bytes; the next byte pushed is not contiguous with them
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    fn cut_at_tail(&mut self) -> Option<Bytes> {
        // Back up one byte so a marker split across pushes is matched
        let start = self.scanned.saturating_sub(REPORT_TAIL.len() - 1);

        match find(&self.buffer[start..], &REPORT_TAIL) {
            Some(pos) => Some(self.split(start + pos + REPORT_TAIL.len())),
            None => {
                if self.buffer.len() > self.max_len {
                    let keep = marker_prefix_len(&self.buffer);
                    self.discard(self.buffer.len() - keep);
                } else {
                    self.scanned = self.buffer.len();
                }
                None
            }
        }
    }

    fn split(&mut self, at: usize) -> Bytes {
        self.scanned = 0;
        self.buffer.split_to(at).freeze()
    }

    fn discard(&mut self, cut: usize) {
        self.buffer.advance(cut);
        self.scanned = 0;
        self.overflows += 1;
    }
}

impl Default for FrameDelimiter {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Length of the trailing bytes that may start a marker still in flight
fn marker_prefix_len(buffer: &[u8]) -> usize {
    (1..REPORT_HEADER.len())
        .rev()
        .find(|&n| buffer.ends_with(&REPORT_HEADER[..n]))
        .or_else(|| buffer.ends_with(&REPORT_TAIL[..1]).then_some(1))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{decode, REPORT_HEADER};

    fn frame(fill: u8) -> Vec<u8> {
        let mut f = REPORT_HEADER.to_vec();
        f.extend_from_slice(&[fill; 24]);
        f.extend_from_slice(&REPORT_TAIL);
        f
    }

    #[test]
    fn test_single_frame() {
        let mut delimiter = FrameDelimiter::default();
        delimiter.push(&frame(0));
        let candidate = delimiter.next_frame().unwrap();
        assert_eq!(candidate.len(), 30);
        assert!(delimiter.next_frame().is_none());
        assert_eq!(delimiter.pending(), 0);
    }

    #[test]
    fn test_two_frames_in_one_read() {
        let mut delimiter = FrameDelimiter::default();
        let mut bytes = frame(0);
        bytes.extend(frame(0x11));
        delimiter.push(&bytes);
        assert_eq!(delimiter.drain().count(), 2);
    }

    #[test]
    fn test_frame_split_across_reads() {
        let bytes = frame(0x22);
        let mut delimiter = FrameDelimiter::default();

        delimiter.push(&bytes[..10]);
        assert!(delimiter.next_frame().is_none());
        delimiter.push(&bytes[10..29]);
        assert!(delimiter.next_frame().is_none());
        delimiter.push(&bytes[29..]);

        let candidate = delimiter.next_frame().unwrap();
        assert_eq!(&candidate[..], &bytes[..]);
    }

    #[test]
    fn test_leftover_bytes_carry_into_next_candidate() {
        let mut delimiter = FrameDelimiter::default();
        let mut bytes = frame(0);
        bytes.extend_from_slice(&REPORT_HEADER);
        delimiter.push(&bytes);

        assert!(delimiter.next_frame().is_some());
        assert!(delimiter.next_frame().is_none());
        assert_eq!(delimiter.pending(), 4);

        delimiter.push(&[0u8; 24]);
        delimiter.push(&REPORT_TAIL);
        let candidate = delimiter.next_frame().unwrap();
        assert!(decode(&candidate).is_some());
    }

    #[test]
    fn test_garbage_stays_with_following_frame() {
        let mut delimiter = FrameDelimiter::default();
        let mut bytes = vec![0x01, 0x02, 0x03];
        bytes.extend(frame(0));
        delimiter.push(&bytes);

        let candidate = delimiter.next_frame().unwrap();
        assert_eq!(candidate.len(), 33);
        assert!(decode(&candidate).is_some());
    }

    #[test]
    fn test_overflow_discards_accumulation() {
        let mut delimiter = FrameDelimiter::new(32);
        delimiter.push(&[0x00; 40]);
        assert!(delimiter.next_frame().is_none());
        assert_eq!(delimiter.overflow_count(), 1);
        assert_eq!(delimiter.pending(), 0);

        delimiter.push(&frame(0));
        assert!(delimiter.next_frame().is_some());
    }

    #[test]
    fn test_tail_bytes_inside_payload_do_not_cut() {
        let mut bytes = frame(0x55);
        bytes[4] = 0x55;
        bytes[5] = 0xCC;
        let mut delimiter = FrameDelimiter::default();
        delimiter.push(&bytes[..8]);
        assert!(delimiter.next_frame().is_none());
        delimiter.push(&bytes[8..]);

        let candidate = delimiter.next_frame().unwrap();
        assert_eq!(&candidate[..], &bytes[..]);
        assert_eq!(decode(&candidate).unwrap()[0].x, 19541);
    }

    #[test]
    fn test_torn_frame_then_complete_frame() {
        let mut delimiter = FrameDelimiter::default();
        let mut bytes = frame(0x11)[..17].to_vec();
        bytes.extend(frame(0x22));
        delimiter.push(&bytes);

        let torn = delimiter.next_frame().unwrap();
        assert_eq!(torn.len(), 17);
        assert!(decode(&torn).is_none());

        let whole = delimiter.next_frame().unwrap();
        assert_eq!(&whole[..], &frame(0x22)[..]);
        assert!(delimiter.next_frame().is_none());
    }

    #[test]
    fn test_spliced_frame_is_cut_for_rejection() {
        let mut delimiter = FrameDelimiter::default();
        let mut bytes = frame(0x11)[..17].to_vec();
        bytes.extend_from_slice(&frame(0x22)[5..]);
        delimiter.push(&bytes);

        let spliced = delimiter.next_frame().unwrap();
        assert!(decode(&spliced).is_none());
        assert_eq!(delimiter.pending(), REPORT_HEADER.len() - 1);

        delimiter.push(&frame(0x33));
        let next = delimiter.next_frame().unwrap();
        assert_eq!(&next[next.len() - FRAME_LEN..], &frame(0x33)[..]);
        assert!(decode(&next).is_some());
    }

    #[test]
    fn test_clear_drops_partial_frame() {
        let mut delimiter = FrameDelimiter::default();
        delimiter.push(&frame(0x11)[..17]);
        assert!(delimiter.next_frame().is_none());
        delimiter.clear();
        assert_eq!(delimiter.pending(), 0);

        delimiter.push(&frame(0x22)[5..]);
        let rest = delimiter.next_frame().unwrap();
        assert!(decode(&rest).is_none());
    }

    #[test]
    fn test_overflow_keeps_split_header() {
        let mut delimiter = FrameDelimiter::new(32);
        let mut bytes = vec![0x00; 40];
        bytes.extend_from_slice(&REPORT_HEADER[..3]);
        delimiter.push(&bytes);
        assert!(delimiter.next_frame().is_none());
        assert_eq!(delimiter.pending(), 3);

        delimiter.push(&frame(0)[3..]);
        assert_eq!(&delimiter.next_frame().unwrap()[..], &frame(0)[..]);
    }

    #[test]
    fn test_overflow_keeps_split_marker_byte() {
        let mut delimiter = FrameDelimiter::new(32);
        let mut bytes = vec![0x00; 40];
        bytes.push(REPORT_TAIL[0]);
        delimiter.push(&bytes);
        assert!(delimiter.next_frame().is_none());
        assert_eq!(delimiter.pending(), 1);

        delimiter.push(&[REPORT_TAIL[1]]);
        let candidate = delimiter.next_frame().unwrap();
        assert_eq!(&candidate[..], &REPORT_TAIL);
    }
}
