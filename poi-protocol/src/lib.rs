//! Poi BLE Ingress Protocol
//!
//! This crate defines everything the poi receives over its BLE RX
//! characteristic: control commands, live-stream sub-frames, and the chunked
//! pattern upload. It is transport-agnostic: callers hand in whatever byte
//! slices the radio delivered, at whatever boundaries it delivered them.
//!
//! # Protocol Overview
//!
//! Control messages use a two-byte envelope:
//! ```text
//! ┌──────┬──────┬──────────────┐
//! │ 0xD0 │ CODE │ ARGS...      │
//! │ 1B   │ 1B   │ 0–510B       │
//! └──────┴──────┴──────────────┘
//! ```
//!
//! Streamed pixel frames are self-delimiting sub-frames that may be split
//! across any number of writes:
//! ```text
//! ┌──────┬──────┬─────┬──────┬───────┬────────┬─────┬───────┬─────────┬──────┐
//! │ 0xD0 │ 0x0D │ VER │ ROWS │ WIDTH │ LEN    │ SEQ │ CRC32 │ PAYLOAD │ 0xD1 │
//! │ 1B   │ 1B   │ 1B  │ 1B   │ 1B    │ 2B BE  │ 2B  │ 4B BE │ LEN     │ 1B   │
//! └──────┴──────┴─────┴──────┴───────┴────────┴─────┴───────┴─────────┴──────┘
//! ```
//!
//! Pattern uploads start with a `SetPattern` command write and continue with
//! raw chunks until one ends in `0xD1` (or is shorter than a full MTU).

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod crc;
pub mod frame;
pub mod reassembler;
pub mod stream_data;
pub mod upload;

pub use command::{Command, CommandCode, CommandError, ConfigReply, Reply, ENVELOPE_START};
pub use frame::{FrameError, FrameHeader, StreamFrame, FRAME_FOOTER, FRAME_SYNC, HEADER_LEN};
pub use reassembler::{FrameReassembler, ReassemblyStats};
pub use stream_data::{StreamDataError, StreamDataFrames};
pub use upload::{ChunkError, UploadChunk, UploadClassifier, MAX_CHUNK_LEN};

/// Bytes per pixel on the wire (R, G, B)
pub const BYTES_PER_PIXEL: usize = 3;
