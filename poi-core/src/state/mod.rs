//! Render mode and cross-task shared state
//!
//! The mode machine is explicit and deterministic; the shared-state object
//! is the only place tasks exchange flags.

pub mod mode;
pub mod shared;

pub use mode::{Mode, ModeEvent};
pub use shared::{RenderGate, SharedState};
