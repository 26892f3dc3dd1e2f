//! Settings commands
//!
//! Applies the commands that only touch [`UserSettings`]. Stream, upload and
//! query commands are handled by the radio task directly.

use poi_protocol::command::{CommandCode, CommandError};
use poi_protocol::Command;

use crate::config::{ShuffleMode, UserSettings, MIN_SHUFFLE_SECS};
use crate::traits::{BANK_COUNT, SLOTS_PER_BANK};

/// Result of offering a command to [`apply_setting`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingOutcome {
    /// Not a settings command
    NotASetting,
    /// Settings changed
    Updated {
        /// Selected pattern changed; render must reopen it
        reload: bool,
        /// Shuffle was switched on; restart its timer
        restart_shuffle: bool,
    },
    /// Argument out of range; settings untouched
    Rejected(CommandError),
}

impl SettingOutcome {
    const fn updated() -> Self {
        SettingOutcome::Updated {
            reload: false,
            restart_shuffle: false,
        }
    }

    const fn reload() -> Self {
        SettingOutcome::Updated {
            reload: true,
            restart_shuffle: false,
        }
    }
}

/// Apply a settings command
pub fn apply_setting(command: &Command<'_>, settings: &mut UserSettings) -> SettingOutcome {
    match *command {
        Command::SetBrightness(value) => {
            settings.brightness = value;
            SettingOutcome::updated()
        }
        Command::SetBrightnessOption(index) => {
            settings.brightness_index = index;
            settings.brightness = settings.brightness_presets[index as usize];
            SettingOutcome::updated()
        }
        Command::SetBrightnessOptions(presets) => {
            settings.brightness_presets = presets;
            SettingOutcome::updated()
        }
        Command::SetSpeedOption(index) => {
            settings.speed_index = index;
            SettingOutcome::updated()
        }
        Command::SetSpeedOptions(presets) => {
            settings.speed_presets = presets;
            SettingOutcome::updated()
        }
        Command::SetBank(bank) => {
            if bank >= BANK_COUNT {
                return SettingOutcome::Rejected(CommandError::InvalidArgument(
                    CommandCode::SetBank,
                ));
            }
            settings.bank = bank;
            SettingOutcome::reload()
        }
        Command::SetPatternSlot(slot) => {
            if slot >= SLOTS_PER_BANK {
                return SettingOutcome::Rejected(CommandError::InvalidArgument(
                    CommandCode::SetPatternSlot,
                ));
            }
            settings.slot = slot;
            SettingOutcome::reload()
        }
        Command::ToggleSlotShuffle => toggle_shuffle(settings, ShuffleMode::WithinBank),
        Command::ToggleBankShuffle => toggle_shuffle(settings, ShuffleMode::AllBanks),
        Command::SetShuffleDuration(secs) => {
            settings.shuffle_duration_s = secs.max(MIN_SHUFFLE_SECS);
            SettingOutcome::updated()
        }
        _ => SettingOutcome::NotASetting,
    }
}

/// Switch `mode` on, or off if it was already on
///
/// The two shuffle modes exclude each other.
fn toggle_shuffle(settings: &mut UserSettings, mode: ShuffleMode) -> SettingOutcome {
    if settings.shuffle == mode {
        settings.shuffle = ShuffleMode::Off;
        SettingOutcome::updated()
    } else {
        settings.shuffle = mode;
        SettingOutcome::Updated {
            reload: false,
            restart_shuffle: true,
        }
    }
}

/// Next bank, wrapping after the last
pub fn next_bank(settings: &mut UserSettings) {
    settings.bank = (settings.bank + 1) % BANK_COUNT;
}
