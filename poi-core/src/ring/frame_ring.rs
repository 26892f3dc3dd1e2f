//! Byte-backed frame ring
//!
//! Frames of any length up to `BYTES` are copied into one circular byte
//! array. A descriptor queue of up to `SLOTS` entries remembers where each
//! frame starts, so frames of different lengths can be mixed and a frame
//! that crosses the end of the array is handed back as two slices.
//!
//! Live frames always occupy one contiguous (modulo `BYTES`) region that
//! starts at the oldest descriptor and ends at the write cursor. Making room
//! therefore only ever means dropping descriptors from the front.

use heapless::Deque;

/// Ring push errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingError {
    /// Zero-length frame
    EmptyFrame,
    /// Frame larger than the whole ring
    FrameTooLarge(usize),
}

/// What a successful push did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PushOutcome {
    /// Frame stored without displacing anything
    Stored,
    /// Frame stored after dropping this many unread frames
    Overwrote(usize),
    /// Sequence number repeated the last accepted one; nothing stored
    Duplicate,
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RingStats {
    pub stored: u32,
    pub duplicates: u32,
    pub overwritten: u32,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    start: usize,
    len: usize,
    seq: Option<u16>,
}

/// A frame borrowed out of the ring
///
/// `head` and `tail` are contiguous in frame order; `tail` is empty unless
/// the frame wrapped around the end of the backing array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub seq: Option<u16>,
    pub head: &'a [u8],
    pub tail: &'a [u8],
}

impl FrameView<'_> {
    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the frame into `out`, returning the bytes written
    pub fn copy_to(&self, out: &mut [u8]) -> usize {
        let n = self.len().min(out.len());
        let first = self.head.len().min(n);
        out[..first].copy_from_slice(&self.head[..first]);
        out[first..n].copy_from_slice(&self.tail[..n - first]);
        n
    }

    /// Iterate the frame bytes in order
    pub fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.head.iter().chain(self.tail.iter()).copied()
    }
}

/// Fixed-capacity FIFO of variable-length frames
pub struct FrameRing<const BYTES: usize, const SLOTS: usize> {
    data: [u8; BYTES],
    slots: Deque<Slot, SLOTS>,
    write_pos: usize,
    used: usize,
    last_seq: Option<u16>,
    frame_len: usize,
    stats: RingStats,
}

impl<const BYTES: usize, const SLOTS: usize> Default for FrameRing<BYTES, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const BYTES: usize, const SLOTS: usize> FrameRing<BYTES, SLOTS> {
    /// Create an empty ring
    pub const fn new() -> Self {
        Self {
            data: [0; BYTES],
            slots: Deque::new(),
            write_pos: 0,
            used: 0,
            last_seq: None,
            frame_len: 0,
            stats: RingStats {
                stored: 0,
                duplicates: 0,
                overwritten: 0,
            },
        }
    }

    /// Store a frame, dropping the oldest unread frames if space runs out
    ///
    /// `seq` is `None` for unsequenced producers; sequenced pushes whose
    /// number equals the last accepted one are dropped.
    pub fn push(&mut self, payload: &[u8], seq: Option<u16>) -> Result<PushOutcome, RingError> {
        let len = payload.len();
        if len == 0 {
            return Err(RingError::EmptyFrame);
        }
        if len > BYTES {
            return Err(RingError::FrameTooLarge(len));
        }
        if seq.is_some() && seq == self.last_seq {
            self.stats.duplicates = self.stats.duplicates.wrapping_add(1);
            return Ok(PushOutcome::Duplicate);
        }

        let mut dropped = 0;
        while self.slots.is_full() || self.used + len > BYTES {
            match self.slots.pop_front() {
                Some(slot) => {
                    self.used -= slot.len;
                    dropped += 1;
                }
                None => break,
            }
        }
        if self.slots.is_empty() {
            self.write_pos = 0;
        }

        let start = self.write_pos;
        let first = len.min(BYTES - start);
        self.data[start..start + first].copy_from_slice(&payload[..first]);
        self.data[..len - first].copy_from_slice(&payload[first..]);

        // Cannot fail: the loop above guarantees a free descriptor
        let _ = self.slots.push_back(Slot { start, len, seq });
        self.write_pos = (start + len) % BYTES;
        self.used += len;
        if seq.is_some() {
            self.last_seq = seq;
        }
        self.frame_len = len;

        self.stats.stored = self.stats.stored.wrapping_add(1);
        self.stats.overwritten = self.stats.overwritten.wrapping_add(dropped as u32);

        Ok(if dropped == 0 {
            PushOutcome::Stored
        } else {
            PushOutcome::Overwrote(dropped)
        })
    }

    /// Take the oldest frame, or `None` if the ring is empty
    pub fn pop(&mut self) -> Option<FrameView<'_>> {
        let slot = self.slots.pop_front()?;
        self.used -= slot.len;

        let first = slot.len.min(BYTES - slot.start);
        Some(FrameView {
            seq: slot.seq,
            head: &self.data[slot.start..slot.start + first],
            tail: &self.data[..slot.len - first],
        })
    }

    /// Drop every frame and forget the last sequence number
    pub fn clear(&mut self) {
        self.slots.clear();
        self.write_pos = 0;
        self.used = 0;
        self.last_seq = None;
    }

    /// Frames waiting to be read
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Unread bytes
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// Length of the most recently stored frame
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Maximum frames held at once
    pub const fn capacity(&self) -> usize {
        SLOTS
    }

    pub fn stats(&self) -> RingStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8, len: usize) -> heapless::Vec<u8, 64> {
        (0..len).map(|i| tag.wrapping_add(i as u8)).collect()
    }

    fn read_back<const B: usize, const S: usize>(
        ring: &mut FrameRing<B, S>,
    ) -> Option<(Option<u16>, heapless::Vec<u8, 64>)> {
        let view = ring.pop()?;
        Some((view.seq, view.bytes().collect()))
    }

    #[test]
    fn test_push_pop_fifo() {
        let mut ring: FrameRing<64, 4> = FrameRing::new();
        ring.push(&frame(1, 6), Some(1)).unwrap();
        ring.push(&frame(2, 6), Some(2)).unwrap();

        assert_eq!(ring.len(), 2);
        assert_eq!(read_back(&mut ring).unwrap(), (Some(1), frame(1, 6)));
        assert_eq!(read_back(&mut ring).unwrap(), (Some(2), frame(2, 6)));
        assert!(ring.pop().is_none());
    }

    #[test]
    fn test_duplicate_sequence_dropped() {
        let mut ring: FrameRing<64, 4> = FrameRing::new();
        assert_eq!(ring.push(&frame(1, 3), Some(7)), Ok(PushOutcome::Stored));
        assert_eq!(ring.push(&frame(1, 3), Some(7)), Ok(PushOutcome::Duplicate));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.stats().duplicates, 1);
    }

    #[test]
    fn test_old_sequence_after_gap_accepted() {
        let mut ring: FrameRing<64, 4> = FrameRing::new();
        ring.push(&frame(1, 3), Some(5)).unwrap();
        ring.push(&frame(2, 3), Some(9)).unwrap();
        assert_eq!(ring.push(&frame(3, 3), Some(5)), Ok(PushOutcome::Stored));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_first_sequence_zero_accepted() {
        let mut ring: FrameRing<64, 4> = FrameRing::new();
        assert_eq!(ring.push(&frame(1, 3), Some(0)), Ok(PushOutcome::Stored));
    }

    #[test]
    fn test_unsequenced_never_deduplicated() {
        let mut ring: FrameRing<64, 4> = FrameRing::new();
        ring.push(&frame(1, 3), None).unwrap();
        ring.push(&frame(1, 3), None).unwrap();
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_capacity_four_keeps_newest() {
        let mut ring: FrameRing<256, 4> = FrameRing::new();
        for seq in 1..=5u16 {
            ring.push(&frame(seq as u8, 12), Some(seq)).unwrap();
        }

        for expected in 2..=5u16 {
            let (seq, bytes) = read_back(&mut ring).unwrap();
            assert_eq!(seq, Some(expected));
            assert_eq!(bytes, frame(expected as u8, 12));
        }
        assert!(ring.pop().is_none());
    }

    #[test]
    fn test_wrap_split_copy() {
        let mut ring: FrameRing<100, 8> = FrameRing::new();
        for seq in 1..=4u16 {
            ring.push(&frame(seq as u8 * 10, 30), Some(seq)).unwrap();
        }

        // Frame 4 straddles the end; frame 1 had to go
        assert_eq!(ring.len(), 3);
        for expected in 2..=4u16 {
            let (seq, bytes) = read_back(&mut ring).unwrap();
            assert_eq!(seq, Some(expected));
            assert_eq!(bytes, frame(expected as u8 * 10, 30));
        }
    }

    #[test]
    fn test_wrapped_view_has_two_parts() {
        let mut ring: FrameRing<16, 4> = FrameRing::new();
        ring.push(&frame(0, 10), None).unwrap();
        let _ = ring.pop();
        ring.push(&frame(50, 10), None).unwrap();

        // Ring drained, so the write cursor restarts at zero
        let view = ring.pop().unwrap();
        assert!(view.tail.is_empty());

        ring.push(&frame(1, 10), None).unwrap();
        ring.push(&frame(2, 4), None).unwrap();
        let _ = ring.pop();
        ring.push(&frame(3, 10), None).unwrap();
        let _ = ring.pop();
        let view = ring.pop().unwrap();
        assert_eq!(view.head.len(), 2);
        assert_eq!(view.tail.len(), 8);

        let mut out = [0u8; 10];
        assert_eq!(view.copy_to(&mut out), 10);
        assert_eq!(&out[..], &frame(3, 10)[..]);
    }

    #[test]
    fn test_frame_len_tracks_latest_push() {
        let mut ring: FrameRing<256, 8> = FrameRing::new();
        ring.push(&frame(0, 60), Some(1)).unwrap();
        assert_eq!(ring.frame_len(), 60);
        ring.push(&frame(0, 30), Some(2)).unwrap();
        assert_eq!(ring.frame_len(), 30);
        assert_eq!(ring.used_bytes(), 90);
    }

    #[test]
    fn test_rejects_bad_lengths() {
        let mut ring: FrameRing<16, 4> = FrameRing::new();
        assert_eq!(ring.push(&[], None), Err(RingError::EmptyFrame));
        assert_eq!(ring.push(&[0u8; 17], None), Err(RingError::FrameTooLarge(17)));
    }

    #[test]
    fn test_clear_resets_sequence() {
        let mut ring: FrameRing<64, 4> = FrameRing::new();
        ring.push(&frame(1, 3), Some(3)).unwrap();
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.push(&frame(1, 3), Some(3)), Ok(PushOutcome::Stored));
    }
}
