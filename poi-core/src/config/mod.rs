//! Configuration types
//!
//! Board configuration parsed from the embedded `poi.toml`, and user
//! settings persisted as postcard binary data.

pub mod parse;
pub mod types;

pub use parse::{parse_config, ParseError};
pub use types::*;
