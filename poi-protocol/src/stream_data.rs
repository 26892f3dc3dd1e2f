//! Fixed-size multi-frame stream writes
//!
//! `StreamData` writes carry whole frames back to back with no per-frame
//! header. Every frame is exactly one strip's worth of RGB bytes; a trailing
//! partial frame is ignored.

use core::slice::ChunksExact;

/// Stream data decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamDataError {
    /// Configured frame length is zero
    ZeroFrameLen,
    /// Write shorter than one frame
    NoCompleteFrame { len: usize, frame_len: usize },
}

/// Iterator over the frames of one `StreamData` write
#[derive(Debug, Clone)]
pub struct StreamDataFrames<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl<'a> StreamDataFrames<'a> {
    /// Split `body` (envelope already stripped) into frames of `frame_len` bytes
    pub fn new(body: &'a [u8], frame_len: usize) -> Result<Self, StreamDataError> {
        if frame_len == 0 {
            return Err(StreamDataError::ZeroFrameLen);
        }
        if body.len() < frame_len {
            return Err(StreamDataError::NoCompleteFrame {
                len: body.len(),
                frame_len,
            });
        }
        Ok(Self {
            chunks: body.chunks_exact(frame_len),
        })
    }

    /// Bytes of the trailing partial frame that will be ignored
    pub fn remainder(&self) -> usize {
        self.chunks.remainder().len()
    }
}

impl<'a> Iterator for StreamDataFrames<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        self.chunks.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for StreamDataFrames<'_> {}
