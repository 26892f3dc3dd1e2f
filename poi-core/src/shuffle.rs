//! Pattern shuffle timer

use crate::config::{ShuffleMode, UserSettings};
use crate::traits::{BANK_COUNT, SLOTS_PER_BANK};

/// Picks a new pattern slot every shuffle period
///
/// Randomness comes from the caller so the timer stays deterministic in
/// tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shuffle {
    last_ms: u32,
}

impl Shuffle {
    pub const fn new(now_ms: u32) -> Self {
        Self { last_ms: now_ms }
    }

    /// Restart the period
    pub fn restart(&mut self, now_ms: u32) {
        self.last_ms = now_ms;
    }

    /// Advance the timer, moving `settings` to a new slot when due
    ///
    /// `random` is only consumed when a new pick is made. Returns `true` if
    /// the selection changed and the pattern must be reloaded.
    pub fn tick(
        &mut self,
        settings: &mut UserSettings,
        now_ms: u32,
        mut random: impl FnMut() -> u32,
    ) -> bool {
        if settings.shuffle == ShuffleMode::Off {
            return false;
        }
        if now_ms.wrapping_sub(self.last_ms) <= settings.shuffle_period_ms() {
            return false;
        }
        self.last_ms = now_ms;

        if settings.shuffle == ShuffleMode::AllBanks {
            settings.bank = (random() % u32::from(BANK_COUNT)) as u8;
        }
        settings.slot = (random() % u32::from(SLOTS_PER_BANK)) as u8;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> impl FnMut() -> u32 {
        let mut n = 0;
        move || {
            n += 1;
            n
        }
    }

    #[test]
    fn test_off_never_fires() {
        let mut settings = UserSettings::default();
        let mut shuffle = Shuffle::new(0);
        assert!(!shuffle.tick(&mut settings, 60_000, counter()));
    }

    #[test]
    fn test_within_bank_keeps_bank() {
        let mut settings = UserSettings {
            shuffle: ShuffleMode::WithinBank,
            bank: 2,
            ..Default::default()
        };
        let mut shuffle = Shuffle::new(0);
        assert!(!shuffle.tick(&mut settings, 5000, counter()));
        assert!(shuffle.tick(&mut settings, 5001, || 7));
        assert_eq!((settings.bank, settings.slot), (2, 2));
        // Period restarts from the pick
        assert!(!shuffle.tick(&mut settings, 9000, || 0));
    }

    #[test]
    fn test_all_banks_moves_bank() {
        let mut settings = UserSettings {
            shuffle: ShuffleMode::AllBanks,
            shuffle_duration_s: 1,
            ..Default::default()
        };
        let mut shuffle = Shuffle::new(0);
        assert!(shuffle.tick(&mut settings, 1001, counter()));
        assert_eq!((settings.bank, settings.slot), (1, 2));
    }

    #[test]
    fn test_restart_delays_next_pick() {
        let mut settings = UserSettings {
            shuffle: ShuffleMode::WithinBank,
            ..Default::default()
        };
        let mut shuffle = Shuffle::new(0);
        shuffle.restart(4000);
        assert!(!shuffle.tick(&mut settings, 6000, counter()));
        assert!(shuffle.tick(&mut settings, 9001, counter()));
    }
}
