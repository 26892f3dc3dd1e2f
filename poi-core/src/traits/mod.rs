//! Hardware abstraction traits
//!
//! These traits define the interface between the application logic
//! and the board-specific implementations.

pub mod battery;
pub mod pixels;
pub mod storage;

#[cfg(test)]
pub(crate) mod memory;

pub use battery::BatterySensor;
pub use pixels::PixelSink;
pub use storage::{PatternSlot, PatternStore, StorageError, BANK_COUNT, SLOTS_PER_BANK, SLOT_COUNT};
