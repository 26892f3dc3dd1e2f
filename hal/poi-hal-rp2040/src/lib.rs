//! RP2040-specific HAL for the poi firmware
//!
//! Implements the `poi-core` hardware traits on the Pico W:
//!
//! - Flash pattern slots (implements `poi_core::traits::PatternStore`)
//! - Wear-leveled user settings in the last 64KB of flash
//! - PIO-driven WS2812 strip (implements `poi_core::traits::PixelSink`)
//! - ADC battery sense (implements `poi_core::traits::BatterySensor`)

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod flash;
pub mod settings;
pub mod ws2812;

pub use flash::PoiFlash;
pub use settings::{SettingsError, StorageKey};
