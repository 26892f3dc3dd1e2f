//! Storage writer task
//!
//! Sole writer of flash. Persists queued upload chunks through the
//! [`UploadPipeline`], discards a half-written file when the link drops, and
//! saves user settings when they change.

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_time::Timer;

use poi_core::traits::PatternStore;
use poi_core::upload::{JobOutcome, UploadError, UploadJob, UploadPipeline};

use crate::channels::{self, SharedFlash, SETTINGS_DIRTY, SHARED, UPLOAD_ABORT, UPLOAD_QUEUE};

/// Pause after a completed upload before render reopens flash
const COOLDOWN_MS: u64 = 100;

#[embassy_executor::task]
pub async fn storage_task(flash: &'static SharedFlash) {
    info!("Storage task started");

    let mut pipeline = UploadPipeline::new();

    loop {
        match select3(UPLOAD_QUEUE.receive(), UPLOAD_ABORT.wait(), SETTINGS_DIRTY.wait()).await {
            Either3::First(job) => write_chunk(flash, &mut pipeline, job).await,
            Either3::Second(generation) => {
                // Chunks still queued for it are dropped as stale when received
                if pipeline.abort(&mut *flash.lock().await, generation).await {
                    warn!("Upload {} aborted", generation);
                } else {
                    debug!("Abort for upload {} had nothing open", generation);
                }
            }
            Either3::Third(()) => {
                let settings = channels::settings();
                match flash.lock().await.save_settings(&settings).await {
                    Ok(()) => debug!("Settings saved"),
                    Err(e) => error!("Failed to save settings: {:?}", e),
                }
            }
        }
    }
}

async fn write_chunk(flash: &'static SharedFlash, pipeline: &mut UploadPipeline, job: UploadJob) {
    let mut store = flash.lock().await;
    match pipeline.process(&mut *store, &SHARED, &job).await {
        JobOutcome::Written { written } => {
            trace!("Upload {}: {} bytes written", job.generation, written);
        }
        JobOutcome::Completed { total } => {
            channels::set_free_bytes(store.free_bytes().await);
            drop(store);
            info!(
                "Upload complete: {} bytes in bank {} slot {}",
                total, job.slot.bank, job.slot.slot
            );
            // A new upload may start during the cooldown; render stays parked
            Timer::after_millis(COOLDOWN_MS).await;
            SHARED.release_render();
        }
        JobOutcome::Stale => {
            debug!("Chunk of dead upload {} dropped", job.generation);
        }
        JobOutcome::Failed(UploadError::NotStarted) => {
            warn!("Upload {} lost its first chunk, ended", job.generation);
        }
        JobOutcome::Failed(e) => {
            error!("Upload {} failed: {:?}", job.generation, e);
        }
    }
}
