//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod battery;
pub mod ble;
pub mod button;
pub mod render;
pub mod storage;

pub use battery::battery_task;
pub use ble::{ble_task, BleController};
pub use button::{button_task, menu_task};
pub use render::render_task;
pub use storage::storage_task;

use embassy_time::Instant;

/// Milliseconds since boot, wrapping after ~49 days
pub fn uptime_ms() -> u32 {
    Instant::now().as_millis() as u32
}
