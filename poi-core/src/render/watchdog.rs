//! Stream producer liveness watchdog
//!
//! The peer can vanish mid-stream without a disconnect event reaching us in
//! time. If no frame arrives inside the window while streaming, the render
//! task falls back to pattern playback on its own.

/// Default silence window before streaming is abandoned
pub const STREAM_TIMEOUT_MS: u32 = 2000;

/// Watchdog verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogStatus {
    /// A frame arrived recently
    Alive,
    /// No frame for `silent_ms`
    Expired { silent_ms: u32 },
}

/// Stream silence detector
#[derive(Debug, Clone, Copy)]
pub struct StreamWatchdog {
    timeout_ms: u32,
}

impl Default for StreamWatchdog {
    fn default() -> Self {
        Self::new(STREAM_TIMEOUT_MS)
    }
}

impl StreamWatchdog {
    pub const fn new(timeout_ms: u32) -> Self {
        Self { timeout_ms }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Compare the uptime clock against the last frame timestamp
    ///
    /// Both are millisecond uptime counters; wrap-around is handled.
    pub fn check(&self, now_ms: u32, last_frame_ms: u32) -> WatchdogStatus {
        let silent_ms = now_ms.wrapping_sub(last_frame_ms);
        if silent_ms > self.timeout_ms {
            WatchdogStatus::Expired { silent_ms }
        } else {
            WatchdogStatus::Alive
        }
    }
}
