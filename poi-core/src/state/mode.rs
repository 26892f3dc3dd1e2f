//! Render mode state machine
//!
//! The mode decides what the render task draws. Transitions are one-way
//! triggers: whoever raises an event applies it, and the render task picks
//! up the new mode on its next iteration.

/// Top-level render modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// Power-on, nothing loaded yet
    Idle = 0,
    /// Playing the selected pattern slot
    Pattern = 1,
    /// Drawing frames from the stream ring
    Streaming = 2,
    /// Pattern upload in progress; render is parked
    Uploading = 3,
}

/// Events that trigger mode transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeEvent {
    /// Start-up finished
    Boot,
    /// Peer sent StartStream
    StartStream,
    /// Peer sent StopStream, or the button menu left streaming
    StopStream,
    /// No stream frame inside the watchdog window
    StreamTimeout,
    /// First upload chunk classified
    UploadStarted,
    /// Upload flag cleared by the writer, successfully or not
    UploadFinished,
    /// BLE connection dropped
    LinkLost,
}

impl ModeEvent {
    /// Whether the transition should make the render task reload its pattern
    pub fn forces_reload(&self) -> bool {
        matches!(
            self,
            ModeEvent::Boot
                | ModeEvent::StopStream
                | ModeEvent::StreamTimeout
                | ModeEvent::UploadFinished
                | ModeEvent::LinkLost
        )
    }
}

impl Mode {
    /// Decode from the atomic representation
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Mode::Pattern,
            2 => Mode::Streaming,
            3 => Mode::Uploading,
            _ => Mode::Idle,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Process an event and return the next mode
    pub fn transition(self, event: ModeEvent) -> Self {
        use Mode::*;
        use ModeEvent::*;

        match (self, event) {
            (Idle, Boot) => Pattern,

            // Upload overrides everything
            (_, UploadStarted) => Uploading,
            (Uploading, UploadFinished) => Pattern,
            (Uploading, _) if event != LinkLost => Uploading,

            (Idle | Pattern | Streaming, StartStream) => Streaming,
            (Streaming, StopStream | StreamTimeout) => Pattern,

            // Recovery: drop whatever was going on
            (_, LinkLost) => Pattern,

            (mode, _) => mode,
        }
    }
}
