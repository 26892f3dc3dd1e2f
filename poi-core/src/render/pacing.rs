//! Render loop timing

/// Default stream consumption rate
pub const DEFAULT_STREAM_HZ: u16 = 200;

/// Highest rate the strip can be refreshed at
pub const MAX_STREAM_HZ: u16 = 500;

/// Minimum yield per render iteration
pub const MIN_YIELD_MS: u32 = 1;

/// Delay between checks while parked for an upload
pub const PARK_POLL_MS: u32 = 30;

/// Frame delay of the generated fallback pattern
pub const FALLBACK_FRAME_MS: u32 = 20;

/// Clamp a requested stream rate into `1..=max_hz`
pub fn clamp_rate(hz: u16, max_hz: u16) -> u16 {
    hz.clamp(1, max_hz.max(1))
}

/// Period between stream frames, in microseconds
pub fn stream_period_us(hz: u16) -> u32 {
    1_000_000 / u32::from(hz.max(1))
}

/// Delay between pattern columns for a speed preset value
///
/// Speed 255 is the fastest; the delay never drops below [`MIN_YIELD_MS`].
pub fn pattern_step_ms(speed: u8) -> u32 {
    (u32::from(255 - speed) / 5).max(MIN_YIELD_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rate() {
        assert_eq!(clamp_rate(0, MAX_STREAM_HZ), 1);
        assert_eq!(clamp_rate(200, MAX_STREAM_HZ), 200);
        assert_eq!(clamp_rate(2000, MAX_STREAM_HZ), 500);
    }

    #[test]
    fn test_stream_period() {
        assert_eq!(stream_period_us(200), 5_000);
        assert_eq!(stream_period_us(500), 2_000);
        assert_eq!(stream_period_us(0), 1_000_000);
    }

    #[test]
    fn test_pattern_step() {
        assert_eq!(pattern_step_ms(150), 21);
        assert_eq!(pattern_step_ms(50), 41);
        assert_eq!(pattern_step_ms(255), 1);
        assert_eq!(pattern_step_ms(254), 1);
    }
}
