//! Configuration type definitions
//!
//! `PoiConfig` is the board configuration parsed from `poi.toml` at boot.
//! `UserSettings` holds what the user changes at runtime and is persisted to
//! flash as postcard-serialized binary data.

use heapless::String;

use poi_protocol::command::PRESET_COUNT;
use poi_protocol::frame::MAX_ROWS;

use crate::render::pacing::{DEFAULT_STREAM_HZ, MAX_STREAM_HZ};
use crate::render::watchdog::STREAM_TIMEOUT_MS;
use crate::traits::{PatternSlot, BANK_COUNT, SLOTS_PER_BANK};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum BLE device name length
pub const MAX_NAME_LEN: usize = 16;

/// Current settings layout version
pub const SETTINGS_VERSION: u8 = 1;

/// Shortest allowed shuffle period
pub const MIN_SHUFFLE_SECS: u8 = 1;

/// LED strip configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StripConfig {
    /// Physical pixel count
    pub pixels: u8,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self { pixels: 20 }
    }
}

/// Mode button configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonConfig {
    /// Pin reads low when pressed
    pub inverted: bool,
    /// Enable internal pull-up
    pub pull_up: bool,
    /// Hold time that arms the menu
    pub long_press_ms: u16,
    /// Quiet time after the last short press before the menu fires
    pub menu_quiet_ms: u16,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            inverted: true,
            pull_up: true,
            long_press_ms: 1000,
            menu_quiet_ms: 1000,
        }
    }
}

/// Live stream configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamConfig {
    pub default_rate_hz: u16,
    pub max_rate_hz: u16,
    /// Silence window before the render task leaves streaming
    pub watchdog_ms: u32,
    /// Verify sub-frame CRC-32
    pub verify_checksum: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_rate_hz: DEFAULT_STREAM_HZ,
            max_rate_hz: MAX_STREAM_HZ,
            watchdog_ms: STREAM_TIMEOUT_MS,
            verify_checksum: true,
        }
    }
}

/// Battery sense configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryConfig {
    /// Resistor divider ratio between the battery and the ADC pin, x1000
    pub divider_x1000: u16,
    /// Sampling interval
    pub interval_s: u16,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            divider_x1000: 3127,
            interval_s: 10,
        }
    }
}

/// Complete board configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PoiConfig {
    pub strip: StripConfig,
    pub button: ButtonConfig,
    pub stream: StreamConfig,
    pub battery: BatteryConfig,
    /// Advertised BLE name
    pub device_name: String<MAX_NAME_LEN>,
}

impl Default for PoiConfig {
    fn default() -> Self {
        let mut device_name = String::new();
        let _ = device_name.push_str("Pixel Poi");
        Self {
            strip: StripConfig::default(),
            button: ButtonConfig::default(),
            stream: StreamConfig::default(),
            battery: BatteryConfig::default(),
            device_name,
        }
    }
}

impl PoiConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strip.pixels == 0 || self.strip.pixels > MAX_ROWS {
            return Err(ConfigError::InvalidValue("strip.pixels"));
        }
        if self.stream.max_rate_hz == 0 || self.stream.max_rate_hz > MAX_STREAM_HZ {
            return Err(ConfigError::InvalidValue("stream.max_rate_hz"));
        }
        if self.stream.default_rate_hz == 0
            || self.stream.default_rate_hz > self.stream.max_rate_hz
        {
            return Err(ConfigError::InvalidValue("stream.default_rate_hz"));
        }
        if self.stream.watchdog_ms == 0 {
            return Err(ConfigError::InvalidValue("stream.watchdog_ms"));
        }
        if self.battery.divider_x1000 < 1000 {
            return Err(ConfigError::InvalidValue("battery.divider_x1000"));
        }
        if self.device_name.is_empty() {
            return Err(ConfigError::InvalidValue("ble.device_name"));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Field failed validation
    InvalidValue(&'static str),
    /// Settings could not be serialized
    Encode,
    /// Stored settings could not be deserialized
    Decode,
    /// Stored settings have a different layout version
    VersionMismatch(u8),
}

/// Pattern shuffle mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShuffleMode {
    #[default]
    Off,
    /// Random slot within the current bank
    WithinBank,
    /// Random bank and slot
    AllBanks,
}

/// User-adjustable settings, persisted across power cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UserSettings {
    /// Layout version, checked on load
    pub version: u8,
    /// Active brightness (0-255)
    pub brightness: u8,
    pub brightness_index: u8,
    pub brightness_presets: [u8; PRESET_COUNT],
    pub speed_index: u8,
    pub speed_presets: [u8; PRESET_COUNT],
    pub bank: u8,
    pub slot: u8,
    pub shuffle: ShuffleMode,
    pub shuffle_duration_s: u8,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl UserSettings {
    /// Factory settings
    pub const fn new() -> Self {
        Self {
            version: SETTINGS_VERSION,
            brightness: 140,
            brightness_index: 3,
            brightness_presets: [10, 40, 80, 140, 200, 255],
            speed_index: 2,
            speed_presets: [50, 100, 150, 200, 230, 255],
            bank: 1,
            slot: 1,
            shuffle: ShuffleMode::Off,
            shuffle_duration_s: 5,
        }
    }

    /// Raw speed of the selected preset
    pub fn speed(&self) -> u8 {
        self.speed_presets[(self.speed_index as usize).min(PRESET_COUNT - 1)]
    }

    /// Selected pattern slot, clamped into range
    pub fn pattern_slot(&self) -> PatternSlot {
        PatternSlot {
            bank: self.bank.min(BANK_COUNT - 1),
            slot: self.slot.min(SLOTS_PER_BANK - 1),
        }
    }

    pub fn shuffle_period_ms(&self) -> u32 {
        u32::from(self.shuffle_duration_s.max(MIN_SHUFFLE_SECS)) * 1000
    }

    /// Serialize into `buf`, returning the encoded length
    #[cfg(feature = "serde")]
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, ConfigError> {
        postcard::to_slice(self, buf)
            .map(|out| out.len())
            .map_err(|_| ConfigError::Encode)
    }

    /// Deserialize, rejecting other layout versions
    #[cfg(feature = "serde")]
    pub fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        let settings: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
        if settings.version != SETTINGS_VERSION {
            return Err(ConfigError::VersionMismatch(settings.version));
        }
        Ok(settings)
    }
}
