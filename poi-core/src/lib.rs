//! Board-agnostic core logic for the poi firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Frame ring buffer between the radio and the render loop
//! - Render mode state machine and the shared cross-task state
//! - Render task driver (pacing, stream watchdog, pattern playback)
//! - Upload writer state machine
//! - Write routing, settings commands, button menu, shuffle timer
//! - Configuration and persisted settings types
//! - Hardware abstraction traits (pattern store, pixels, battery)

#![no_std]
#![deny(unsafe_code)]

pub mod button;
pub mod config;
pub mod control;
pub mod ingress;
pub mod render;
pub mod ring;
pub mod shuffle;
pub mod state;
pub mod traits;
pub mod upload;
