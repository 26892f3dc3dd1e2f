//! Inter-task communication
//!
//! Statics shared between the Embassy tasks. Each item notes which task
//! writes it.

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU16, Ordering};

use poi_core::button::{ButtonEdge, ButtonEvent};
use poi_core::config::UserSettings;
use poi_core::render::pacing::DEFAULT_STREAM_HZ;
use poi_core::ring::{SharedRing, StreamRing};
use poi_core::state::SharedState;
use poi_core::upload::UploadJob;
use poi_hal_rp2040::PoiFlash;

/// Upload chunks the radio may queue ahead of the writer
pub const UPLOAD_QUEUE_DEPTH: usize = 20;

const BUTTON_EDGE_DEPTH: usize = 8;
const MENU_EVENT_DEPTH: usize = 4;

/// Flash shared by the render task (reads) and the storage task (writes)
pub type SharedFlash = Mutex<CriticalSectionRawMutex, PoiFlash<'static>>;

/// Mode, upload flag, render pause gate and stream timing
pub static SHARED: SharedState = SharedState::new(DEFAULT_STREAM_HZ);

/// Stream frames: radio task pushes, render task pops
pub static STREAM_RING: SharedRing<CriticalSectionRawMutex> =
    BlockingMutex::new(RefCell::new(StreamRing::new()));

/// Upload chunks: radio task sends, storage task receives
pub static UPLOAD_QUEUE: Channel<CriticalSectionRawMutex, UploadJob, UPLOAD_QUEUE_DEPTH> =
    Channel::new();

/// Link lost mid-upload: radio task signals the dead upload's generation,
/// storage task discards it if the writer still has it open
pub static UPLOAD_ABORT: Signal<CriticalSectionRawMutex, u32> = Signal::new();

/// User settings: radio and render tasks write
pub static SETTINGS: BlockingMutex<CriticalSectionRawMutex, Cell<UserSettings>> =
    BlockingMutex::new(Cell::new(UserSettings::new()));

/// Settings changed and should be persisted
pub static SETTINGS_DIRTY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Shuffle switched on: radio task signals, render task restarts its timer
pub static SHUFFLE_RESTART: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Timestamped button edges: button task sends, menu task receives
pub static BUTTON_EDGES: Channel<CriticalSectionRawMutex, ButtonEdge, BUTTON_EDGE_DEPTH> =
    Channel::new();

/// Menu events: menu task sends, render task applies them
pub static MENU_EVENTS: Channel<CriticalSectionRawMutex, ButtonEvent, MENU_EVENT_DEPTH> =
    Channel::new();

/// Last battery reading in millivolts: battery task writes
pub static BATTERY_MV: AtomicU16 = AtomicU16::new(0);

/// Free pattern storage in KiB: storage task writes
pub static FREE_KB: AtomicU16 = AtomicU16::new(0);

/// Snapshot of the current settings
pub fn settings() -> UserSettings {
    SETTINGS.lock(|s| s.get())
}

/// Modify the settings in place, returning what `f` returns
pub fn update_settings<R>(f: impl FnOnce(&mut UserSettings) -> R) -> R {
    SETTINGS.lock(|cell| {
        let mut settings = cell.get();
        let result = f(&mut settings);
        cell.set(settings);
        result
    })
}

pub fn battery_mv() -> u16 {
    BATTERY_MV.load(Ordering::Relaxed)
}

pub fn free_kb() -> u16 {
    FREE_KB.load(Ordering::Relaxed)
}

/// Publish free pattern storage, given in bytes
pub fn set_free_bytes(bytes: u32) {
    let kb = (bytes / 1024).min(u32::from(u16::MAX)) as u16;
    FREE_KB.store(kb, Ordering::Relaxed);
}
