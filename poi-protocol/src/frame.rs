//! Stream sub-frame layout and encoding
//!
//! Frame format (multi-byte fields big-endian):
//! - SYNC (2 bytes): 0xD0 0x0D
//! - VERSION (1 byte): protocol version, currently 1
//! - ROWS (1 byte): pixel rows in this frame (1-144)
//! - WIDTH (1 byte): reserved, carried through unchanged
//! - LENGTH (2 bytes): payload length, always ROWS * 3
//! - SEQ (2 bytes): sender sequence number
//! - CRC32 (4 bytes): CRC-32/IEEE over bytes 1..9 (type byte through SEQ) and the payload
//! - PAYLOAD (LENGTH bytes): RGB triplets
//! - FOOTER (1 byte): 0xD1

use heapless::Vec;

use crate::crc::Crc32;
use crate::BYTES_PER_PIXEL;

/// Two-byte synchronization marker that opens every sub-frame
pub const FRAME_SYNC: [u8; 2] = [0xD0, 0x0D];

/// Trailing marker byte
pub const FRAME_FOOTER: u8 = 0xD1;

/// Only protocol version understood by this firmware
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Fixed header length, sync marker through CRC
pub const HEADER_LEN: usize = 13;

/// Maximum rows a single sub-frame may declare
pub const MAX_ROWS: u8 = 144;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD: usize = MAX_ROWS as usize * BYTES_PER_PIXEL;

/// Maximum complete frame size (header + payload + footer)
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD + 1;

// Header field offsets
const OFF_TYPE: usize = 1;
const OFF_VERSION: usize = 2;
const OFF_ROWS: usize = 3;
const OFF_WIDTH: usize = 4;
const OFF_LEN: usize = 5;
const OFF_SEQ: usize = 7;
const OFF_CRC: usize = 9;

/// Errors raised while validating or encoding a sub-frame
///
/// Every validation variant is a resynchronization error: the reassembler
/// counts it, drops the candidate frame, and goes back to searching for sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Version byte is not [`PROTOCOL_VERSION`]
    BadVersion(u8),
    /// Row count is zero or above [`MAX_ROWS`]
    BadRowCount(u8),
    /// Declared payload length is not rows * 3
    LengthMismatch { rows: u8, len: u16 },
    /// Declared payload length exceeds [`MAX_PAYLOAD`]
    PayloadTooLarge(u16),
    /// Trailing byte is not [`FRAME_FOOTER`]
    BadFooter(u8),
    /// CRC over header and payload did not match
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Parsed fixed-size header of a sub-frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    pub version: u8,
    pub rows: u8,
    pub width: u8,
    pub payload_len: u16,
    pub seq: u16,
    pub crc: u32,
}

impl FrameHeader {
    /// Parse a header from the first [`HEADER_LEN`] bytes of `bytes`
    ///
    /// The caller has already matched the sync marker. Returns `None` if
    /// fewer than [`HEADER_LEN`] bytes are available.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            version: bytes[OFF_VERSION],
            rows: bytes[OFF_ROWS],
            width: bytes[OFF_WIDTH],
            payload_len: u16::from_be_bytes([bytes[OFF_LEN], bytes[OFF_LEN + 1]]),
            seq: u16::from_be_bytes([bytes[OFF_SEQ], bytes[OFF_SEQ + 1]]),
            crc: u32::from_be_bytes([
                bytes[OFF_CRC],
                bytes[OFF_CRC + 1],
                bytes[OFF_CRC + 2],
                bytes[OFF_CRC + 3],
            ]),
        })
    }

    /// Check version, row count and declared length
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.version != PROTOCOL_VERSION {
            return Err(FrameError::BadVersion(self.version));
        }
        if self.rows == 0 || self.rows > MAX_ROWS {
            return Err(FrameError::BadRowCount(self.rows));
        }
        if self.payload_len as usize > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge(self.payload_len));
        }
        if self.payload_len as usize != self.rows as usize * BYTES_PER_PIXEL {
            return Err(FrameError::LengthMismatch {
                rows: self.rows,
                len: self.payload_len,
            });
        }
        Ok(())
    }

    /// Total on-wire length of the frame this header announces
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.payload_len as usize + 1
    }

    /// The eight checksummed header bytes, type byte through sequence number
    fn checksummed_bytes(&self) -> [u8; OFF_CRC - OFF_TYPE] {
        let len = self.payload_len.to_be_bytes();
        let seq = self.seq.to_be_bytes();
        [
            FRAME_SYNC[1],
            self.version,
            self.rows,
            self.width,
            len[0],
            len[1],
            seq[0],
            seq[1],
        ]
    }

    /// CRC-32 over the checksummed header fields and `payload`
    pub fn compute_crc(&self, payload: &[u8]) -> u32 {
        let mut crc = Crc32::new();
        crc.update(&self.checksummed_bytes());
        crc.update(payload);
        crc.finish()
    }
}

/// A validated stream frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    /// Sender sequence number
    pub seq: u16,
    /// Declared pixel rows
    pub rows: u8,
    /// Reserved width byte
    pub width: u8,
    /// RGB payload, `rows * 3` bytes
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

impl StreamFrame {
    /// Build a frame from RGB bytes; the row count is derived from the length
    pub fn new(seq: u16, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge(payload.len() as u16));
        }
        if payload.is_empty() || payload.len() % BYTES_PER_PIXEL != 0 {
            return Err(FrameError::LengthMismatch {
                rows: (payload.len() / BYTES_PER_PIXEL) as u8,
                len: payload.len() as u16,
            });
        }
        let mut data = Vec::new();
        data.extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge(payload.len() as u16))?;
        Ok(Self {
            seq,
            rows: (payload.len() / BYTES_PER_PIXEL) as u8,
            width: 1,
            payload: data,
        })
    }

    /// Header describing this frame, checksum included
    pub fn header(&self) -> FrameHeader {
        let mut header = FrameHeader {
            version: PROTOCOL_VERSION,
            rows: self.rows,
            width: self.width,
            payload_len: self.payload.len() as u16,
            seq: self.seq,
            crc: 0,
        };
        header.crc = header.compute_crc(&self.payload);
        header
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let header = self.header();
        let frame_len = header.frame_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = FRAME_SYNC[0];
        buffer[OFF_TYPE..OFF_CRC].copy_from_slice(&header.checksummed_bytes());
        buffer[OFF_CRC..HEADER_LEN].copy_from_slice(&header.crc.to_be_bytes());
        buffer[HEADER_LEN..HEADER_LEN + self.payload.len()].copy_from_slice(&self.payload);
        buffer[frame_len - 1] = FRAME_FOOTER;

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_LEN>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_LEN];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}
