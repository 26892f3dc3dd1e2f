//! Property tests for sub-frame reassembly over arbitrary fragmentation

use poi_protocol::frame::{MAX_FRAME_LEN, MAX_PAYLOAD};
use poi_protocol::{FrameReassembler, StreamFrame};
use proptest::prelude::*;

/// Noise that can never form the sync marker
fn noise() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>().prop_filter("no sync byte", |b| *b != 0xD0), 0..600)
}

fn frame_bytes(seq: u16, rows: usize, seed: u8) -> Vec<u8> {
    let payload: Vec<u8> = (0..rows * 3).map(|i| (i as u8).wrapping_mul(seed)).collect();
    StreamFrame::new(seq, &payload)
        .unwrap()
        .encode_to_vec()
        .unwrap()
        .to_vec()
}

/// Split `bytes` into fragments of at most `size` bytes
fn feed_in_chunks(asm: &mut FrameReassembler, bytes: &[u8], size: usize) -> Vec<StreamFrame> {
    let mut out = Vec::new();
    for fragment in bytes.chunks(size) {
        out.extend(asm.feed(fragment));
        assert!(asm.buffered() <= MAX_FRAME_LEN);
    }
    out
}

proptest! {
    #[test]
    fn one_frame_survives_any_chunking(
        before in noise(),
        after in noise(),
        seq in any::<u16>(),
        rows in 1usize..=144,
        seed in any::<u8>(),
        chunk in 1usize..=MAX_FRAME_LEN,
    ) {
        let frame = frame_bytes(seq, rows, seed);
        let mut stream = before.clone();
        stream.extend_from_slice(&frame);
        stream.extend_from_slice(&after);

        let mut asm = FrameReassembler::new();
        let frames = feed_in_chunks(&mut asm, &stream, chunk);

        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].seq, seq);
        prop_assert_eq!(frames[0].payload.len(), rows * 3);
        prop_assert!(asm.is_idle());
    }

    #[test]
    fn buffer_never_exceeds_capacity(
        bytes in prop::collection::vec(any::<u8>(), 0..4096),
        chunk in 1usize..=512,
    ) {
        let mut asm = FrameReassembler::new();
        let _ = feed_in_chunks(&mut asm, &bytes, chunk);
        prop_assert!(asm.buffered() <= MAX_FRAME_LEN);
    }

    #[test]
    fn back_to_back_frames_in_order(
        seqs in prop::collection::vec(any::<u16>(), 1..8),
        rows in 1usize..=40,
        chunk in 1usize..=180,
    ) {
        let mut stream = Vec::new();
        for (i, seq) in seqs.iter().enumerate() {
            stream.extend_from_slice(&frame_bytes(*seq, rows, i as u8 + 1));
        }

        let mut asm = FrameReassembler::new();
        let frames = feed_in_chunks(&mut asm, &stream, chunk);
        let got: Vec<u16> = frames.iter().map(|f| f.seq).collect();
        prop_assert_eq!(got, seqs);
    }
}

#[test]
fn max_size_frame_fits() {
    let frame = frame_bytes(1, MAX_PAYLOAD / 3, 7);
    assert_eq!(frame.len(), MAX_FRAME_LEN);

    let mut asm = FrameReassembler::new();
    let frames = feed_in_chunks(&mut asm, &frame, 20);
    assert_eq!(frames.len(), 1);
}
