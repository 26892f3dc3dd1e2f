//! Pattern upload chunk classification
//!
//! A pattern upload is a `SetPattern` command write followed by raw
//! continuation writes. The first write carries the 2-byte envelope, which
//! must not reach flash. The last write ends in [`UPLOAD_TERMINATOR`]; if the
//! sender omits it, a write shorter than a full ATT payload also ends the
//! upload.

use heapless::Vec;

use crate::command::{CommandCode, ENVELOPE_LEN};

/// Largest write the radio will hand over
pub const MAX_CHUNK_LEN: usize = 512;

/// Trailing byte marking the last chunk of an upload
pub const UPLOAD_TERMINATOR: u8 = 0xD1;

/// ATT header bytes subtracted from the MTU to get the write payload size
const ATT_WRITE_OVERHEAD: u16 = 3;

/// Chunk classification errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkError {
    /// Zero-length write
    Empty,
    /// Write longer than [`MAX_CHUNK_LEN`]
    TooLong(usize),
    /// First chunk does not start with the `SetPattern` envelope
    NotUploadStart,
}

/// One classified upload write, owned until the writer persists it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadChunk {
    data: Vec<u8, MAX_CHUNK_LEN>,
    skip: usize,
    first: bool,
    is_final: bool,
    terminated: bool,
}

impl UploadChunk {
    fn new(
        write: &[u8],
        skip: usize,
        first: bool,
        is_final: bool,
        terminated: bool,
    ) -> Result<Self, ChunkError> {
        let data = Vec::from_slice(write).map_err(|_| ChunkError::TooLong(write.len()))?;
        Ok(Self {
            data,
            skip,
            first,
            is_final,
            terminated,
        })
    }

    /// Bytes to persist: the write minus skipped header and terminator
    pub fn payload(&self) -> &[u8] {
        let end = if self.terminated {
            self.data.len() - 1
        } else {
            self.data.len()
        };
        &self.data[self.skip.min(end)..end]
    }

    /// Raw write length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Header bytes discarded from the front
    pub fn skip(&self) -> usize {
        self.skip
    }

    /// First chunk of an upload
    pub fn is_first(&self) -> bool {
        self.first
    }

    /// Last chunk of an upload
    pub fn is_final(&self) -> bool {
        self.is_final
    }
}

/// Classifies upload writes into [`UploadChunk`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadClassifier {
    full_write_len: Option<usize>,
}

impl UploadClassifier {
    /// Classifier with the short-write heuristic disabled
    pub const fn new() -> Self {
        Self {
            full_write_len: None,
        }
    }

    /// Record the negotiated ATT MTU, enabling the short-write heuristic
    pub fn set_mtu(&mut self, att_mtu: u16) {
        let payload = att_mtu.saturating_sub(ATT_WRITE_OVERHEAD) as usize;
        self.full_write_len = (payload > 0).then_some(payload.min(MAX_CHUNK_LEN));
    }

    /// Classify the `SetPattern` write that opens an upload
    pub fn first_chunk(&self, write: &[u8]) -> Result<UploadChunk, ChunkError> {
        if CommandCode::peek(write) != Some(CommandCode::SetPattern) {
            return Err(ChunkError::NotUploadStart);
        }
        let terminated = write.len() > ENVELOPE_LEN && write.last() == Some(&UPLOAD_TERMINATOR);
        UploadChunk::new(write, ENVELOPE_LEN, true, terminated, terminated)
    }

    /// Classify a write received while an upload is active
    pub fn continuation(&self, write: &[u8]) -> Result<UploadChunk, ChunkError> {
        if write.is_empty() {
            return Err(ChunkError::Empty);
        }
        let terminated = write.last() == Some(&UPLOAD_TERMINATOR);
        let short = self.full_write_len.is_some_and(|full| write.len() < full);
        UploadChunk::new(write, 0, false, terminated || short, terminated)
    }
}
