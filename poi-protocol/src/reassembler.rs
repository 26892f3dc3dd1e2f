//! Sub-frame reassembly from BLE write fragments
//!
//! The radio delivers bytes at write granularity, never frame granularity:
//! one write may carry half a header, three frames, or a frame tail plus
//! noise. [`FrameReassembler`] keeps a bounded assembly buffer and walks a
//! small state machine over it:
//!
//! ```text
//!  SyncSearch ──(D0 0D found)──▶ Header ──(valid)──▶ Payload ──(footer+crc ok)──▶ emit
//!      ▲                           │                    │
//!      └──────── drop 1 byte ◀─────┴──── invalid ◀──────┘
//! ```
//!
//! A rejected candidate only costs its first byte, so a real frame hiding
//! behind a false sync marker is still found.

use heapless::Vec;

use crate::frame::{
    FrameError, FrameHeader, StreamFrame, FRAME_FOOTER, FRAME_SYNC, HEADER_LEN, MAX_FRAME_LEN,
};

/// Where the reassembler is in the current candidate frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssemblyState {
    /// Scanning for the sync marker
    SyncSearch,
    /// Sync marker at offset 0, waiting for the full header
    Header,
    /// Header validated, waiting for payload and footer
    Payload(FrameHeader),
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReassemblyStats {
    /// Frames emitted
    pub frames: u32,
    /// Candidates rejected (bad header, footer or checksum)
    pub resyncs: u32,
    /// Most recent rejection reason
    pub last_error: Option<FrameError>,
}

/// Incremental sub-frame reassembler
#[derive(Debug, Clone)]
pub struct FrameReassembler {
    buffer: Vec<u8, MAX_FRAME_LEN>,
    state: AssemblyState,
    verify_checksum: bool,
    stats: ReassemblyStats,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReassembler {
    /// Create a reassembler with checksum verification enabled
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: AssemblyState::SyncSearch,
            verify_checksum: true,
            stats: ReassemblyStats {
                frames: 0,
                resyncs: 0,
                last_error: None,
            },
        }
    }

    /// Enable or disable CRC verification
    pub fn set_verify_checksum(&mut self, verify: bool) {
        self.verify_checksum = verify;
    }

    /// Feed one transport fragment
    ///
    /// Returns an iterator over every frame completed by this fragment.
    /// Fragment bytes not yet pulled into the assembly buffer when the
    /// iterator is dropped are discarded.
    pub fn feed<'a>(&'a mut self, fragment: &'a [u8]) -> Frames<'a> {
        Frames {
            assembler: self,
            input: fragment,
        }
    }

    /// Drop any partial frame and return to sync search
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = AssemblyState::SyncSearch;
    }

    /// Current state
    pub fn state(&self) -> AssemblyState {
        self.state
    }

    /// True while searching for a sync marker
    pub fn is_idle(&self) -> bool {
        self.state == AssemblyState::SyncSearch
    }

    /// Bytes currently held in the assembly buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Diagnostic counters
    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }

    /// How many more bytes to pull before the next decision point
    fn wanted(&self) -> usize {
        let room = MAX_FRAME_LEN - self.buffer.len();
        let target = match self.state {
            AssemblyState::SyncSearch => return room,
            AssemblyState::Header => HEADER_LEN,
            AssemblyState::Payload(header) => header.frame_len(),
        };
        target.saturating_sub(self.buffer.len()).min(room)
    }

    /// Run the state machine over buffered bytes
    ///
    /// Returns `None` when more input is needed.
    fn advance(&mut self) -> Option<StreamFrame> {
        loop {
            match self.state {
                AssemblyState::SyncSearch => match find_sync(&self.buffer) {
                    Some(offset) => {
                        self.discard(offset);
                        self.state = AssemblyState::Header;
                    }
                    None => {
                        // A trailing 0xD0 may be the first half of a split marker
                        let keep = self.buffer.last() == Some(&FRAME_SYNC[0]);
                        let drop = self.buffer.len() - usize::from(keep);
                        self.discard(drop);
                        return None;
                    }
                },
                AssemblyState::Header => {
                    let header = FrameHeader::parse(&self.buffer)?;
                    match header.validate() {
                        Ok(()) => self.state = AssemblyState::Payload(header),
                        Err(e) => self.resync(e),
                    }
                }
                AssemblyState::Payload(header) => {
                    let frame_len = header.frame_len();
                    if self.buffer.len() < frame_len {
                        return None;
                    }
                    match self.complete(&header) {
                        Ok(frame) => {
                            self.discard(frame_len);
                            self.state = AssemblyState::SyncSearch;
                            self.stats.frames = self.stats.frames.wrapping_add(1);
                            return Some(frame);
                        }
                        Err(e) => self.resync(e),
                    }
                }
            }
        }
    }

    /// Check footer and checksum of a fully buffered frame
    fn complete(&self, header: &FrameHeader) -> Result<StreamFrame, FrameError> {
        let frame_len = header.frame_len();
        let footer = self.buffer[frame_len - 1];
        if footer != FRAME_FOOTER {
            return Err(FrameError::BadFooter(footer));
        }

        let payload = &self.buffer[HEADER_LEN..frame_len - 1];
        if self.verify_checksum {
            let actual = header.compute_crc(payload);
            if actual != header.crc {
                return Err(FrameError::ChecksumMismatch {
                    expected: header.crc,
                    actual,
                });
            }
        }

        let payload = Vec::from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge(header.payload_len))?;
        Ok(StreamFrame {
            seq: header.seq,
            rows: header.rows,
            width: header.width,
            payload,
        })
    }

    /// Reject the current candidate: drop its first byte and rescan
    fn resync(&mut self, error: FrameError) {
        self.stats.resyncs = self.stats.resyncs.wrapping_add(1);
        self.stats.last_error = Some(error);
        self.discard(1);
        self.state = AssemblyState::SyncSearch;
    }

    /// Remove `count` bytes from the front of the buffer
    fn discard(&mut self, count: usize) {
        let len = self.buffer.len();
        let count = count.min(len);
        self.buffer.copy_within(count..len, 0);
        self.buffer.truncate(len - count);
    }
}

/// Frames completed by one [`FrameReassembler::feed`] call
pub struct Frames<'a> {
    assembler: &'a mut FrameReassembler,
    input: &'a [u8],
}

impl Iterator for Frames<'_> {
    type Item = StreamFrame;

    fn next(&mut self) -> Option<StreamFrame> {
        loop {
            let take = self.assembler.wanted().min(self.input.len());
            let (head, rest) = self.input.split_at(take);
            // Cannot fail: `take` never exceeds the remaining capacity
            let _ = self.assembler.buffer.extend_from_slice(head);
            self.input = rest;

            if let Some(frame) = self.assembler.advance() {
                return Some(frame);
            }
            if self.input.is_empty() {
                return None;
            }
        }
    }
}

fn find_sync(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|w| w == FRAME_SYNC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MAX_PAYLOAD;

    fn payload(rows: usize) -> Vec<u8, MAX_PAYLOAD> {
        let mut v = Vec::new();
        for i in 0..rows * 3 {
            v.push((i % 200) as u8).unwrap();
        }
        v
    }

    fn encoded(seq: u16, rows: usize) -> Vec<u8, MAX_FRAME_LEN> {
        StreamFrame::new(seq, &payload(rows))
            .unwrap()
            .encode_to_vec()
            .unwrap()
    }

    #[test]
    fn test_three_fragment_scenario() {
        let bytes = encoded(5, 20);
        assert_eq!(bytes.len(), 74);

        let mut asm = FrameReassembler::new();
        assert!(asm.feed(&bytes[..7]).next().is_none());
        assert!(asm.feed(&bytes[7..57]).next().is_none());
        let frame = asm.feed(&bytes[57..]).next().unwrap();

        assert_eq!(frame.seq, 5);
        assert_eq!(frame.payload.len(), 60);
        assert_eq!(frame.rows, 20);
        assert!(asm.is_idle());
        assert_eq!(asm.buffered(), 0);
    }

    #[test]
    fn test_zero_rows_rejected() {
        let mut bytes = encoded(5, 20);
        bytes[3] = 0;

        let mut asm = FrameReassembler::new();
        assert!(asm.feed(&bytes).next().is_none());
        assert!(asm.is_idle());
        assert_eq!(asm.stats().last_error, Some(FrameError::BadRowCount(0)));
        assert_eq!(asm.stats().frames, 0);
    }

    #[test]
    fn test_bad_footer_then_good_frame() {
        let mut bad = encoded(1, 4);
        let last = bad.len() - 1;
        bad[last] = 0x00;
        let good = encoded(2, 4);

        let mut asm = FrameReassembler::new();
        assert!(asm.feed(&bad).next().is_none());
        assert_eq!(asm.stats().last_error, Some(FrameError::BadFooter(0)));

        let frame = asm.feed(&good).next().unwrap();
        assert_eq!(frame.seq, 2);
    }

    #[test]
    fn test_checksum_mismatch_resyncs() {
        let mut bytes = encoded(3, 2);
        bytes[HEADER_LEN] ^= 0xFF;

        let mut asm = FrameReassembler::new();
        assert!(asm.feed(&bytes).next().is_none());
        assert!(matches!(
            asm.stats().last_error,
            Some(FrameError::ChecksumMismatch { .. })
        ));
        assert_eq!(asm.stats().resyncs, 1);
    }

    #[test]
    fn test_checksum_disabled() {
        let mut bytes = encoded(3, 2);
        bytes[9] ^= 0xFF;

        let mut asm = FrameReassembler::new();
        asm.set_verify_checksum(false);
        assert_eq!(asm.feed(&bytes).next().unwrap().seq, 3);
    }

    #[test]
    fn test_sync_split_across_fragments() {
        let bytes = encoded(7, 1);
        let mut asm = FrameReassembler::new();

        assert!(asm.feed(&[0x42, 0x43, bytes[0]]).next().is_none());
        assert_eq!(asm.buffered(), 1);
        let frame = asm.feed(&bytes[1..]).next().unwrap();
        assert_eq!(frame.seq, 7);
    }

    #[test]
    fn test_noise_without_sync_keeps_at_most_one_byte() {
        let mut asm = FrameReassembler::new();
        assert!(asm.feed(&[1, 2, 3, 4, 5]).next().is_none());
        assert_eq!(asm.buffered(), 0);
        assert!(asm.feed(&[1, 2, 0xD0]).next().is_none());
        assert_eq!(asm.buffered(), 1);
    }

    #[test]
    fn test_two_frames_in_one_fragment() {
        let a = encoded(10, 3);
        let b = encoded(11, 5);
        let mut joined: Vec<u8, 256> = Vec::new();
        joined.extend_from_slice(&a).unwrap();
        joined.extend_from_slice(&b).unwrap();

        let mut asm = FrameReassembler::new();
        let mut frames = asm.feed(&joined);
        assert_eq!(frames.next().unwrap().seq, 10);
        assert_eq!(frames.next().unwrap().seq, 11);
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_command_prefix_is_skipped() {
        // Sub-frames arrive wrapped in a StartStream command write
        let bytes = encoded(12, 2);
        let mut packet: Vec<u8, 64> = Vec::new();
        packet.extend_from_slice(&[0xD0, 0x15]).unwrap();
        packet.extend_from_slice(&bytes).unwrap();

        let mut asm = FrameReassembler::new();
        assert_eq!(asm.feed(&packet).next().unwrap().seq, 12);
    }

    #[test]
    fn test_long_noise_before_frame_in_same_fragment() {
        let bytes = encoded(20, 20);
        let mut packet: Vec<u8, 1024> = Vec::new();
        for i in 0..600u32 {
            packet.push((i % 0xC0) as u8).unwrap();
        }
        packet.extend_from_slice(&bytes).unwrap();

        let mut asm = FrameReassembler::new();
        let frame = asm.feed(&packet).next().unwrap();
        assert_eq!(frame.seq, 20);
        assert!(asm.buffered() <= MAX_FRAME_LEN);
    }

    #[test]
    fn test_false_sync_inside_noise() {
        // A stray marker followed by garbage must not swallow the real frame
        let bytes = encoded(30, 2);
        let mut packet: Vec<u8, 64> = Vec::new();
        packet.extend_from_slice(&[0xD0, 0x0D, 0x07, 0x01]).unwrap();
        packet.extend_from_slice(&bytes).unwrap();

        let mut asm = FrameReassembler::new();
        assert_eq!(asm.feed(&packet).next().unwrap().seq, 30);
        assert_eq!(asm.stats().last_error, Some(FrameError::BadVersion(0x07)));
    }

    #[test]
    fn test_reset_clears_partial_frame() {
        let bytes = encoded(1, 10);
        let mut asm = FrameReassembler::new();
        assert!(asm.feed(&bytes[..20]).next().is_none());
        assert!(!asm.is_idle());

        asm.reset();
        assert!(asm.is_idle());
        assert_eq!(asm.buffered(), 0);
    }
}
