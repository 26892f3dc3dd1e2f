//! User settings persistence
//!
//! Uses sequential-storage for wear-leveled key-value storage in the last
//! 64KB of flash. Settings are postcard-encoded by `poi-core`.

use core::ops::Range;

use sequential_storage::cache::NoCache;
use sequential_storage::map::{self, Key, SerializationError};

use poi_core::config::{ConfigError, UserSettings};

use crate::flash::{PoiFlash, FLASH_SIZE, PATTERN_RANGE};

/// Size of the settings partition
pub const SETTINGS_PARTITION_SIZE: usize = 64 * 1024;

/// Start of the settings partition
pub const SETTINGS_PARTITION_START: usize = FLASH_SIZE - SETTINGS_PARTITION_SIZE;

/// Flash range for the settings partition
pub const SETTINGS_RANGE: Range<u32> = (SETTINGS_PARTITION_START as u32)..(FLASH_SIZE as u32);

const _: () = assert!(PATTERN_RANGE.end <= SETTINGS_RANGE.start);

/// Scratch buffer for one stored item, key and encoded settings included
const ITEM_BUFFER_LEN: usize = 128;

/// Keys in the settings partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// postcard-encoded `UserSettings`
    UserSettings = 0,
}

impl StorageKey {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageKey::UserSettings),
            _ => None,
        }
    }
}

impl Key for StorageKey {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        if buffer.is_empty() {
            return Err(SerializationError::BufferTooSmall);
        }
        buffer[0] = self.as_u8();
        Ok(1)
    }

    fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
        if buffer.is_empty() {
            return Err(SerializationError::BufferTooSmall);
        }
        match StorageKey::from_u8(buffer[0]) {
            Some(key) => Ok((key, 1)),
            None => Err(SerializationError::InvalidFormat),
        }
    }
}

/// Errors from settings persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Nothing stored yet
    NotFound,
    /// sequential-storage or flash failure
    Storage,
    /// Stored bytes did not decode
    Config(ConfigError),
}

impl From<ConfigError> for SettingsError {
    fn from(err: ConfigError) -> Self {
        SettingsError::Config(err)
    }
}

impl PoiFlash<'_> {
    /// Load the persisted user settings
    pub async fn load_settings(&mut self) -> Result<UserSettings, SettingsError> {
        let mut data_buffer = [0u8; ITEM_BUFFER_LEN];

        let result = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &StorageKey::UserSettings,
        )
        .await;

        match result {
            Ok(Some(data)) => Ok(UserSettings::decode(data)?),
            Ok(None) => Err(SettingsError::NotFound),
            Err(_) => Err(SettingsError::Storage),
        }
    }

    /// Persist the user settings
    pub async fn save_settings(&mut self, settings: &UserSettings) -> Result<(), SettingsError> {
        let mut encoded = [0u8; ITEM_BUFFER_LEN];
        let len = settings.encode(&mut encoded)?;
        let mut data_buffer = [0u8; ITEM_BUFFER_LEN];

        map::store_item(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &StorageKey::UserSettings,
            &&encoded[..len],
        )
        .await
        .map_err(|_| SettingsError::Storage)
    }
}
