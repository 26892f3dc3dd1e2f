//! Configuration loading with fallbacks
//!
//! Neither source is allowed to stop the boot: a broken board file falls
//! back to built-in defaults and missing or stale settings fall back to
//! factory settings.

use defmt::*;

use poi_core::config::{parse_config, PoiConfig, UserSettings};
use poi_hal_rp2040::{PoiFlash, SettingsError};

/// Parse the embedded board configuration
pub fn load_board_config(source: &str) -> PoiConfig {
    match parse_config(source) {
        Ok(config) => {
            info!(
                "Board config: {} pixels, stream {}Hz (max {}Hz), watchdog {}ms",
                config.strip.pixels,
                config.stream.default_rate_hz,
                config.stream.max_rate_hz,
                config.stream.watchdog_ms
            );
            config
        }
        Err(e) => {
            // build.rs validates poi.toml, so this only trips on parser drift
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using built-in defaults");
            PoiConfig::default()
        }
    }
}

/// Load persisted user settings
pub async fn load_settings(flash: &mut PoiFlash<'_>) -> UserSettings {
    match flash.load_settings().await {
        Ok(settings) => {
            info!(
                "Settings loaded: bank {} slot {} brightness {}",
                settings.bank, settings.slot, settings.brightness
            );
            settings
        }
        Err(SettingsError::NotFound) => {
            info!("No stored settings, using factory settings");
            UserSettings::default()
        }
        Err(e) => {
            warn!("Stored settings unusable ({:?}), using factory settings", e);
            UserSettings::default()
        }
    }
}
