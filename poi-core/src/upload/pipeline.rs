//! Upload hand-off between the radio and storage tasks
//!
//! The radio side classifies writes and queues them without waiting; the
//! storage side drains the queue into an [`UploadWriter`]. Every job is
//! stamped with the generation of the upload it belongs to, so chunks and
//! aborts left over from a dropped link can never touch the upload that
//! replaced it.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use poi_protocol::UploadChunk;

use crate::state::SharedState;
use crate::traits::{PatternSlot, PatternStore};

use super::writer::{ChunkResult, UploadError, UploadWriter};

/// One queued upload write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    /// Upload this chunk belongs to
    pub generation: u32,
    pub slot: PatternSlot,
    pub chunk: UploadChunk,
}

/// Result of queueing one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueOutcome {
    /// Chunk queued; `started` carries the generation of a new upload
    Queued { started: Option<u32> },
    /// Queue full; the write must be refused so the peer retries it
    Full,
}

/// Radio side: queue `chunk` for the storage task without waiting
///
/// The upload flag goes up only once a first chunk is safely queued, so a
/// refused first write leaves routing untouched.
pub fn queue_chunk<M: RawMutex, const N: usize>(
    shared: &SharedState,
    queue: &Channel<M, UploadJob, N>,
    chunk: UploadChunk,
    slot: PatternSlot,
) -> QueueOutcome {
    let first = chunk.is_first();
    let generation = if first {
        shared.next_upload_generation()
    } else {
        shared.upload_generation()
    };

    if queue.try_send(UploadJob { generation, slot, chunk }).is_err() {
        return QueueOutcome::Full;
    }
    QueueOutcome::Queued {
        started: first.then(|| shared.begin_upload()),
    }
}

/// What the storage side did with one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JobOutcome {
    /// Chunk written; more expected
    Written { written: u32 },
    /// Final chunk persisted and the upload flag cleared. Render stays
    /// parked until [`SharedState::release_render`].
    Completed { total: u32 },
    /// Job belongs to an upload that is no longer live; dropped
    Stale,
    /// Upload ended early; the flag is down and render released
    Failed(UploadError),
}

/// Storage side: generation-aware wrapper around [`UploadWriter`]
#[derive(Default)]
pub struct UploadPipeline {
    writer: UploadWriter,
    /// Generation the writer has open
    open: Option<u32>,
}

impl UploadPipeline {
    pub const fn new() -> Self {
        Self {
            writer: UploadWriter::new(),
            open: None,
        }
    }

    /// Generation of the upload being written, if any
    pub fn open_generation(&self) -> Option<u32> {
        self.open
    }

    /// Persist one queued job
    pub async fn process<S: PatternStore>(
        &mut self,
        store: &mut S,
        shared: &SharedState,
        job: &UploadJob,
    ) -> JobOutcome {
        if !shared.is_live_upload(job.generation) {
            if self.open == Some(job.generation) {
                self.discard(store).await;
            }
            return JobOutcome::Stale;
        }

        if !job.chunk.is_first() && self.open != Some(job.generation) {
            // The start of this upload never reached flash
            shared.end_upload(job.generation);
            return JobOutcome::Failed(UploadError::NotStarted);
        }

        match self.writer.handle(store, &job.chunk, job.slot).await {
            Ok(ChunkResult::Accepted { written }) => {
                self.open = Some(job.generation);
                JobOutcome::Written { written }
            }
            Ok(ChunkResult::Completed { total }) => {
                self.open = None;
                shared.complete_upload(job.generation);
                JobOutcome::Completed { total }
            }
            Err(e) => {
                self.open = None;
                shared.end_upload(job.generation);
                JobOutcome::Failed(e)
            }
        }
    }

    /// Drop `generation` if it is the upload being written
    ///
    /// Returns `false` for an abort that arrives after a newer upload has
    /// already taken over the writer.
    pub async fn abort<S: PatternStore>(&mut self, store: &mut S, generation: u32) -> bool {
        if self.open != Some(generation) {
            return false;
        }
        self.discard(store).await;
        true
    }

    async fn discard<S: PatternStore>(&mut self, store: &mut S) {
        self.writer.abort(store).await;
        self.open = None;
    }
}
