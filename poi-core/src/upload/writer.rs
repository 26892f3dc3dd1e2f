//! Upload writer state machine
//!
//! Consumes classified chunks in order and persists them to a pattern slot.
//! The destination is opened lazily on the first chunk, after removing
//! whatever the slot held before.

use poi_protocol::UploadChunk;

use crate::traits::{PatternSlot, PatternStore, StorageError};

/// Errors from the upload writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadError {
    /// Continuation chunk arrived with no upload open
    NotStarted,
    /// Storage failed; the upload was aborted
    Storage(StorageError),
}

impl From<StorageError> for UploadError {
    fn from(e: StorageError) -> Self {
        UploadError::Storage(e)
    }
}

/// Result of handling one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkResult {
    /// Chunk written; more expected
    Accepted { written: u32 },
    /// Final chunk written and the slot closed
    Completed { total: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum WriterState {
    Idle,
    Writing { slot: PatternSlot, written: u32 },
}

/// Persists one upload at a time
pub struct UploadWriter {
    state: WriterState,
}

impl Default for UploadWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadWriter {
    pub const fn new() -> Self {
        Self {
            state: WriterState::Idle,
        }
    }

    pub fn is_writing(&self) -> bool {
        matches!(self.state, WriterState::Writing { .. })
    }

    /// Slot of the upload in progress
    pub fn slot(&self) -> Option<PatternSlot> {
        match self.state {
            WriterState::Writing { slot, .. } => Some(slot),
            WriterState::Idle => None,
        }
    }

    /// Write one chunk
    ///
    /// A first chunk always starts a fresh upload into `slot`, discarding any
    /// session left open. Any storage failure aborts the session and the
    /// writer returns to idle.
    pub async fn handle<S: PatternStore>(
        &mut self,
        store: &mut S,
        chunk: &UploadChunk,
        slot: PatternSlot,
    ) -> Result<ChunkResult, UploadError> {
        if chunk.is_first() {
            if self.is_writing() {
                store.abort().await;
            }
            self.state = WriterState::Idle;

            match store.remove(slot).await {
                Ok(()) | Err(StorageError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
            store.create(slot).await?;
            self.state = WriterState::Writing { slot, written: 0 };
        }

        let WriterState::Writing { slot, written } = self.state else {
            return Err(UploadError::NotStarted);
        };

        let payload = chunk.payload();
        if !payload.is_empty() {
            if let Err(e) = store.append(payload).await {
                self.abort(store).await;
                return Err(e.into());
            }
        }
        let written = written + payload.len() as u32;

        if chunk.is_final() {
            self.state = WriterState::Idle;
            return match store.finish().await {
                Ok(total) => Ok(ChunkResult::Completed { total }),
                Err(e) => {
                    store.abort().await;
                    Err(e.into())
                }
            };
        }

        self.state = WriterState::Writing { slot, written };
        Ok(ChunkResult::Accepted { written })
    }

    /// Drop the upload in progress, if any
    pub async fn abort<S: PatternStore>(&mut self, store: &mut S) {
        if self.is_writing() {
            store.abort().await;
        }
        self.state = WriterState::Idle;
    }
}
