//! Process-wide state shared between the radio, storage and render tasks
//!
//! Every field has exactly one writer role. Readers may observe a value one
//! iteration late; nothing here is waited upon.

use portable_atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use super::mode::{Mode, ModeEvent};

/// Request/acknowledge pair used to park the render task
///
/// The radio task requests a pause when an upload starts; the render task
/// acknowledges by parking, and only then does the radio side consider the
/// strip idle.
pub struct RenderGate {
    /// Writer: radio task (request), radio or storage task (release)
    pause_requested: AtomicBool,
    /// Writer: render task
    parked: AtomicBool,
}

impl Default for RenderGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderGate {
    pub const fn new() -> Self {
        Self {
            pause_requested: AtomicBool::new(false),
            parked: AtomicBool::new(false),
        }
    }

    pub fn request_pause(&self) {
        self.pause_requested.store(true, Ordering::Release);
    }

    /// Withdraw the pause request; the render task resumes on its next check
    pub fn release(&self) {
        self.pause_requested.store(false, Ordering::Release);
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::Acquire)
    }

    /// Render side: record that the task is parked
    ///
    /// Returns `true` the first time after a request, so the caller can log
    /// or signal the transition once.
    pub fn acknowledge(&self) -> bool {
        !self.parked.swap(true, Ordering::AcqRel)
    }

    /// Render side: leave the parked state
    ///
    /// Returns `true` if the task was parked.
    pub fn resume(&self) -> bool {
        self.parked.swap(false, Ordering::AcqRel)
    }

    pub fn is_parked(&self) -> bool {
        self.parked.load(Ordering::Acquire)
    }
}

/// Shared flags and counters
pub struct SharedState {
    /// Writer: radio task (commands), render task (watchdog, upload completion)
    mode: AtomicU8,
    /// Writer: radio task sets; storage task clears on finish or abort,
    /// radio task clears on link loss
    upload_active: AtomicBool,
    /// Writer: radio task. Bumped by every upload start so queued work can
    /// be matched to the upload it belongs to
    upload_generation: AtomicU32,
    /// Writer: radio task. Uptime of the last accepted stream frame, in ms
    last_frame_ms: AtomicU32,
    /// Writer: radio task
    stream_rate_hz: AtomicU16,
    /// Writer: storage and radio tasks set, render task takes
    reload_requested: AtomicBool,
    /// Upload pause handshake
    pub gate: RenderGate,
}

impl SharedState {
    pub const fn new(stream_rate_hz: u16) -> Self {
        Self {
            mode: AtomicU8::new(Mode::Idle as u8),
            upload_active: AtomicBool::new(false),
            upload_generation: AtomicU32::new(0),
            last_frame_ms: AtomicU32::new(0),
            stream_rate_hz: AtomicU16::new(stream_rate_hz),
            reload_requested: AtomicBool::new(false),
            gate: RenderGate::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Apply a mode event, returning `(previous, next)`
    ///
    /// Reload-forcing events also raise the reload flag when the mode
    /// actually changed.
    pub fn apply(&self, event: ModeEvent) -> (Mode, Mode) {
        let mut next = Mode::Idle;
        let previous = self
            .mode
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                next = Mode::from_u8(raw).transition(event);
                Some(next.as_u8())
            })
            .map(Mode::from_u8)
            .unwrap_or_else(Mode::from_u8);

        if previous != next && event.forces_reload() {
            self.request_reload();
        }
        (previous, next)
    }

    pub fn upload_active(&self) -> bool {
        self.upload_active.load(Ordering::Acquire)
    }

    /// Generation of the most recently started upload
    pub fn upload_generation(&self) -> u32 {
        self.upload_generation.load(Ordering::Acquire)
    }

    /// Generation the next [`begin_upload`](Self::begin_upload) will hand out
    pub fn next_upload_generation(&self) -> u32 {
        self.upload_generation().wrapping_add(1)
    }

    /// True while `generation` is the upload in progress
    pub fn is_live_upload(&self, generation: u32) -> bool {
        self.upload_active() && self.upload_generation() == generation
    }

    /// Radio side: mark an upload as started and ask render to park
    ///
    /// Returns the generation of the new upload.
    pub fn begin_upload(&self) -> u32 {
        let generation = self.next_upload_generation();
        self.upload_generation.store(generation, Ordering::Release);
        self.upload_active.store(true, Ordering::Release);
        self.gate.request_pause();
        self.apply(ModeEvent::UploadStarted);
        generation
    }

    /// Link loss or write failure: clear the upload flag and release render
    ///
    /// Does nothing unless `generation` is the live upload, so a late call
    /// for a dead upload cannot end its successor. The mode itself is moved
    /// back by the render task once it observes the flag down, so the
    /// pattern reload happens in the consumer.
    pub fn end_upload(&self, generation: u32) -> bool {
        if !self.is_live_upload(generation) {
            return false;
        }
        self.upload_active.store(false, Ordering::Release);
        self.gate.release();
        self.request_reload();
        true
    }

    /// Storage side: the final chunk of `generation` is persisted
    ///
    /// Clears the upload flag so a new upload can start at once, but keeps
    /// render parked until [`release_render`](Self::release_render).
    pub fn complete_upload(&self, generation: u32) -> bool {
        if !self.is_live_upload(generation) {
            return false;
        }
        self.upload_active.store(false, Ordering::Release);
        true
    }

    /// Storage side: let render back onto flash after a completed upload
    ///
    /// Ignored while another upload is running.
    pub fn release_render(&self) -> bool {
        if self.upload_active() {
            return false;
        }
        self.gate.release();
        self.request_reload();
        true
    }

    pub fn note_frame(&self, now_ms: u32) {
        self.last_frame_ms.store(now_ms, Ordering::Release);
    }

    pub fn last_frame_ms(&self) -> u32 {
        self.last_frame_ms.load(Ordering::Acquire)
    }

    pub fn set_stream_rate(&self, hz: u16) {
        self.stream_rate_hz.store(hz, Ordering::Release);
    }

    pub fn stream_rate_hz(&self) -> u16 {
        self.stream_rate_hz.load(Ordering::Acquire)
    }

    pub fn request_reload(&self) {
        self.reload_requested.store(true, Ordering::Release);
    }

    /// Render side: consume a pending reload request
    pub fn take_reload(&self) -> bool {
        self.reload_requested.swap(false, Ordering::AcqRel)
    }
}
