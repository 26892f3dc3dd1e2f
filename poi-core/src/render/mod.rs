//! Render task driver
//!
//! Pacing, the stream watchdog, pattern playback, and the pixel mapping
//! the render task invokes each iteration.

pub mod driver;
pub mod effects;
pub mod pacing;
pub mod player;
pub mod watchdog;

pub use driver::{Decision, RenderDriver, RenderStep};
pub use effects::Scanner;
pub use player::{PatternInfo, PatternPlayer, PlayerError, MAX_COLUMN_LEN};
pub use watchdog::{StreamWatchdog, WatchdogStatus, STREAM_TIMEOUT_MS};
