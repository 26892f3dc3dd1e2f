//! Configuration loading
//!
//! The board configuration comes from the embedded `poi.toml`; the user
//! settings come from flash.

pub mod loader;

pub use loader::{load_board_config, load_settings};
