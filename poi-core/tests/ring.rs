//! Property tests for the frame ring

use poi_core::ring::{FrameRing, PushOutcome};
use proptest::prelude::*;

type SmallRing = FrameRing<256, 8>;

fn read_all<const B: usize, const S: usize>(
    ring: &mut FrameRing<B, S>,
) -> Vec<(Option<u16>, Vec<u8>)> {
    let mut out = Vec::new();
    while let Some(view) = ring.pop() {
        out.push((view.seq, view.bytes().collect()));
    }
    out
}

proptest! {
    /// Whatever survives in the ring reads back byte-for-byte, in order,
    /// and is the newest suffix of what was pushed.
    #[test]
    fn survivors_read_back_exactly(
        frames in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..=100), 1..40),
    ) {
        let mut ring = SmallRing::new();
        for (i, frame) in frames.iter().enumerate() {
            let outcome = ring.push(frame, Some(i as u16)).unwrap();
            prop_assert_ne!(outcome, PushOutcome::Duplicate);
            prop_assert!(ring.used_bytes() <= 256);
            prop_assert!(ring.len() <= 8);
        }

        let got = read_all(&mut ring);
        prop_assert!(!got.is_empty());
        let skipped = frames.len() - got.len();
        for (k, (seq, bytes)) in got.iter().enumerate() {
            prop_assert_eq!(*seq, Some((skipped + k) as u16));
            prop_assert_eq!(bytes, &frames[skipped + k]);
        }
    }

    /// Interleaved pushes and pops keep FIFO order across many wraps
    #[test]
    fn interleaved_wraps_preserve_bytes(
        lens in prop::collection::vec(1usize..=90, 1..200),
        pop_every in 1usize..4,
    ) {
        let mut ring = SmallRing::new();
        let mut expected = std::collections::VecDeque::new();
        for (i, len) in lens.iter().enumerate() {
            let frame: Vec<u8> = (0..*len).map(|b| (b as u8) ^ (i as u8)).collect();
            if let PushOutcome::Overwrote(n) = ring.push(&frame, None).unwrap() {
                for _ in 0..n {
                    expected.pop_front();
                }
            }
            expected.push_back(frame);

            if i % pop_every == 0 {
                let view = ring.pop().unwrap();
                let want = expected.pop_front().unwrap();
                prop_assert_eq!(view.bytes().collect::<Vec<u8>>(), want);
            }
        }
        let rest: Vec<Vec<u8>> = read_all(&mut ring).into_iter().map(|(_, b)| b).collect();
        prop_assert_eq!(rest, expected.into_iter().collect::<Vec<_>>());
    }

    /// Repeating a sequence number stores exactly one frame
    #[test]
    fn repeated_seq_stored_once(seq in any::<u16>(), repeats in 2usize..10) {
        let mut ring = SmallRing::new();
        for _ in 0..repeats {
            let _ = ring.push(&[1, 2, 3], Some(seq)).unwrap();
        }
        prop_assert_eq!(ring.len(), 1);
        prop_assert_eq!(ring.stats().duplicates as usize, repeats - 1);
    }
}

#[test]
fn capacity_four_keeps_newest() {
    let mut ring: FrameRing<1024, 4> = FrameRing::new();
    for seq in 1..=5u16 {
        ring.push(&[seq as u8; 60], Some(seq)).unwrap();
    }
    let seqs: Vec<Option<u16>> = read_all(&mut ring).into_iter().map(|(s, _)| s).collect();
    assert_eq!(seqs, vec![Some(2), Some(3), Some(4), Some(5)]);
}
