//! Routing of RX characteristic writes
//!
//! Every write on the RX characteristic lands in exactly one place: the
//! upload queue, the frame reassembler, or the command handler. Link loss
//! tears down everything the connection left half-done.

use embassy_sync::blocking_mutex::raw::RawMutex;
use poi_protocol::command::{CommandCode, ENVELOPE_LEN};
use poi_protocol::{FrameReassembler, FRAME_SYNC};

use crate::ring::SharedRing;
use crate::state::{Mode, ModeEvent, SharedState};

/// Destination of one write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    /// Continuation chunk of the active upload
    UploadChunk,
    /// Continuation fragment of a partial sub-frame
    Reassemble,
    /// Control command
    Command,
    /// Nothing wants this write
    Drop,
}

/// Ingress state the router looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngressState {
    pub upload_active: bool,
    /// Reassembler holds a partial frame
    pub reassembling: bool,
    pub mode: Mode,
}

/// True for a `StartStream` write that opens a new sub-frame
pub fn opens_subframe(write: &[u8]) -> bool {
    CommandCode::peek(write) == Some(CommandCode::StartStream)
        && write[ENVELOPE_LEN..].starts_with(&FRAME_SYNC)
}

/// Decide where a write goes
///
/// Order matters: an active upload swallows everything, then a partial
/// frame claims continuation fragments, then the command envelope is
/// checked. A write that opens a new sub-frame is always a command, even
/// mid-frame, so a stalled partial frame cannot swallow fresh ones.
pub fn route(write: &[u8], state: IngressState) -> Route {
    if write.is_empty() {
        return Route::Drop;
    }
    if state.upload_active {
        return Route::UploadChunk;
    }
    if state.reassembling && !opens_subframe(write) {
        return Route::Reassemble;
    }
    // A bare sub-frame shares its first bytes with the SetDeviceName envelope
    if state.mode == Mode::Streaming && write.starts_with(&FRAME_SYNC) {
        return Route::Reassemble;
    }
    if CommandCode::peek(write).is_some() {
        return Route::Command;
    }
    if state.mode == Mode::Streaming {
        return Route::Reassemble;
    }
    Route::Drop
}

/// What a link loss tore down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Teardown {
    /// Generation of the upload cut off, which the writer must discard
    pub aborted_upload: Option<u32>,
    /// Unread stream frames dropped from the ring
    pub frames_dropped: usize,
    pub from: Mode,
    pub to: Mode,
}

/// Connection closed: drop partial frames, any live upload and buffered
/// stream frames, then fall back to pattern playback
pub fn link_lost<M: RawMutex>(
    shared: &SharedState,
    ring: &SharedRing<M>,
    reassembler: &mut FrameReassembler,
) -> Teardown {
    reassembler.reset();

    let generation = shared.upload_generation();
    let aborted_upload = shared.end_upload(generation).then_some(generation);

    let (from, to) = shared.apply(ModeEvent::LinkLost);
    let frames_dropped = ring.lock(|ring| {
        let mut ring = ring.borrow_mut();
        let dropped = ring.len();
        ring.clear();
        dropped
    });

    Teardown {
        aborted_upload,
        frames_dropped,
        from,
        to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use crate::ring::StreamRing;

    fn ring() -> SharedRing<NoopRawMutex> {
        SharedRing::new(RefCell::new(StreamRing::new()))
    }

    const IDLE: IngressState = IngressState {
        upload_active: false,
        reassembling: false,
        mode: Mode::Pattern,
    };

    #[test]
    fn test_commands_route_to_handler() {
        assert_eq!(route(&[0xD0, 0x02, 100], IDLE), Route::Command);
        assert_eq!(route(&[0xD0, 0x17], IDLE), Route::Command);
    }

    #[test]
    fn test_upload_swallows_everything() {
        let state = IngressState {
            upload_active: true,
            ..IDLE
        };
        assert_eq!(route(&[0xD0, 0x16], state), Route::UploadChunk);
        assert_eq!(route(&[1, 2, 3], state), Route::UploadChunk);
    }

    #[test]
    fn test_partial_frame_claims_fragments() {
        let state = IngressState {
            reassembling: true,
            mode: Mode::Streaming,
            ..IDLE
        };
        assert_eq!(route(&[0xD0, 0x02, 1, 2], state), Route::Reassemble);
        assert_eq!(route(&[9, 9, 9], state), Route::Reassemble);
    }

    #[test]
    fn test_new_subframe_preempts_partial() {
        let state = IngressState {
            reassembling: true,
            mode: Mode::Streaming,
            ..IDLE
        };
        assert_eq!(route(&[0xD0, 0x15, 0xD0, 0x0D, 1], state), Route::Command);
        assert!(!opens_subframe(&[0xD0, 0x15, 0x00, 0xC8]));
    }

    #[test]
    fn test_stray_bytes() {
        assert_eq!(route(&[1, 2, 3], IDLE), Route::Drop);
        assert_eq!(route(&[0xD0, 0x99], IDLE), Route::Drop);
        assert_eq!(route(&[], IDLE), Route::Drop);

        let streaming = IngressState {
            mode: Mode::Streaming,
            ..IDLE
        };
        assert_eq!(route(&[1, 2, 3], streaming), Route::Reassemble);
    }

    #[test]
    fn test_bare_subframe_while_streaming() {
        let streaming = IngressState {
            mode: Mode::Streaming,
            ..IDLE
        };
        assert_eq!(route(&[0xD0, 0x0D, 0x01, 0x14], streaming), Route::Reassemble);
        // Outside streaming the same bytes are a SetDeviceName command
        assert_eq!(route(&[0xD0, 0x0D, 0x01, 0x14], IDLE), Route::Command);
    }

    #[test]
    fn test_link_loss_mid_upload_clears_everything() {
        let shared = SharedState::new(200);
        shared.apply(ModeEvent::Boot);
        shared.apply(ModeEvent::StartStream);
        let ring = ring();
        ring.lock(|r| {
            let mut r = r.borrow_mut();
            r.push(&[1, 2, 3], Some(1)).unwrap();
            r.push(&[4, 5, 6], Some(2)).unwrap();
        });
        let mut reassembler = FrameReassembler::new();
        assert!(reassembler.feed(&[0xD0, 0x0D, 0x01]).next().is_none());
        assert!(!reassembler.is_idle());
        let generation = shared.begin_upload();
        shared.take_reload();

        let teardown = link_lost(&shared, &ring, &mut reassembler);

        assert_eq!(
            teardown,
            Teardown {
                aborted_upload: Some(generation),
                frames_dropped: 2,
                from: Mode::Uploading,
                to: Mode::Pattern,
            }
        );
        assert!(reassembler.is_idle());
        assert_eq!(reassembler.buffered(), 0);
        assert!(ring.lock(|r| r.borrow().is_empty()));
        assert!(!shared.upload_active());
        assert!(!shared.gate.pause_requested());
        assert_eq!(shared.mode(), Mode::Pattern);
        assert!(shared.take_reload());
    }

    #[test]
    fn test_link_loss_while_streaming() {
        let shared = SharedState::new(200);
        shared.apply(ModeEvent::Boot);
        shared.apply(ModeEvent::StartStream);
        let ring = ring();
        let mut reassembler = FrameReassembler::new();

        let teardown = link_lost(&shared, &ring, &mut reassembler);
        assert_eq!(teardown.aborted_upload, None);
        assert_eq!((teardown.from, teardown.to), (Mode::Streaming, Mode::Pattern));
        assert_eq!(shared.mode(), Mode::Pattern);
    }

    #[test]
    fn test_link_loss_after_completed_upload() {
        let shared = SharedState::new(200);
        shared.apply(ModeEvent::Boot);
        let generation = shared.begin_upload();
        shared.complete_upload(generation);
        let ring = ring();
        let mut reassembler = FrameReassembler::new();

        // Nothing left to abort; storage releases render after its cooldown
        let teardown = link_lost(&shared, &ring, &mut reassembler);
        assert_eq!(teardown.aborted_upload, None);
        assert_eq!(shared.mode(), Mode::Pattern);
        assert!(shared.gate.pause_requested());
    }
}
