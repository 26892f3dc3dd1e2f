//! Pattern upload persistence

pub mod pipeline;
pub mod writer;

pub use pipeline::{queue_chunk, JobOutcome, QueueOutcome, UploadJob, UploadPipeline};
pub use writer::{ChunkResult, UploadError, UploadWriter};
