//! Frame buffering between the BLE producer and the render consumer

pub mod frame_ring;

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;

pub use frame_ring::{FrameRing, FrameView, PushOutcome, RingError, RingStats};

use poi_protocol::frame::MAX_PAYLOAD;

/// Frames the stream ring holds: 300 ms of buffering at 500 Hz
pub const STREAM_RING_FRAMES: usize = 150;

/// Pixel bytes the stream ring holds: 42 maximum-size frames
pub const STREAM_RING_BYTES: usize = MAX_PAYLOAD * 42;

/// Ring used for live streaming
pub type StreamRing = FrameRing<STREAM_RING_BYTES, STREAM_RING_FRAMES>;

/// Stream ring shared between the radio and render tasks
pub type SharedRing<M> = Mutex<M, RefCell<StreamRing>>;
