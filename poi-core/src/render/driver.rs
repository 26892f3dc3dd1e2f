//! Render task decision logic
//!
//! Each render iteration asks the driver what to do. The driver reads the
//! shared flags, applies the consumer-side mode transitions (boot, stream
//! watchdog, upload completion), and answers with one step. It never waits.

use crate::state::{Mode, ModeEvent, SharedState};

use super::watchdog::{StreamWatchdog, WatchdogStatus};

/// What the render task should do this iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderStep {
    /// Stay off the strip's data path; `entered` is set on the first
    /// parked iteration after a pause request
    Park { entered: bool },
    /// Consume one frame from the stream ring
    Stream,
    /// Advance the pattern; `reload` asks for the slot to be reopened first
    Pattern { reload: bool },
}

/// One iteration's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decision {
    pub step: RenderStep,
    /// Mode transition the driver applied, if any
    pub transition: Option<(ModeEvent, Mode, Mode)>,
}

/// Consumer-side state machine driver
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderDriver {
    watchdog: StreamWatchdog,
}

impl RenderDriver {
    pub const fn new(watchdog: StreamWatchdog) -> Self {
        Self { watchdog }
    }

    /// Decide the next step at uptime `now_ms`
    pub fn step(&mut self, shared: &SharedState, now_ms: u32) -> Decision {
        if shared.gate.pause_requested() {
            let entered = shared.gate.acknowledge();
            return Decision {
                step: RenderStep::Park { entered },
                transition: None,
            };
        }
        shared.gate.resume();

        let transition = match shared.mode() {
            Mode::Idle => Some(ModeEvent::Boot),
            Mode::Uploading if !shared.upload_active() => Some(ModeEvent::UploadFinished),
            Mode::Streaming => match self.watchdog.check(now_ms, shared.last_frame_ms()) {
                WatchdogStatus::Expired { .. } => Some(ModeEvent::StreamTimeout),
                WatchdogStatus::Alive => None,
            },
            _ => None,
        }
        .map(|event| {
            let (from, to) = shared.apply(event);
            (event, from, to)
        });

        let step = match shared.mode() {
            Mode::Streaming => RenderStep::Stream,
            // Upload flag still up without a pause request: writer has not
            // caught up yet, keep the strip quiet
            Mode::Uploading => RenderStep::Park { entered: false },
            Mode::Idle | Mode::Pattern => RenderStep::Pattern {
                reload: shared.take_reload(),
            },
        };

        Decision { step, transition }
    }
}
