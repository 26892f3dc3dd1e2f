//! Battery voltage sensing

/// ADC reference voltage
pub const ADC_VREF_MV: u32 = 3300;

/// Full-scale count of a 12-bit ADC
pub const ADC_FULL_SCALE: u32 = 4096;

/// Trait for battery voltage measurement
pub trait BatterySensor {
    /// Sample the battery voltage in millivolts
    ///
    /// Returns `None` if the conversion failed.
    fn read_millivolts(&mut self) -> impl core::future::Future<Output = Option<u16>>;
}

/// Convert a 12-bit ADC count behind a resistor divider into battery mV
///
/// `divider_x1000` is the divider ratio times 1000.
pub fn adc_to_millivolts(raw: u16, divider_x1000: u16) -> u16 {
    let pin_mv = u32::from(raw) * ADC_VREF_MV / ADC_FULL_SCALE;
    let battery_mv = pin_mv * u32::from(divider_x1000) / 1000;
    battery_mv.min(u32::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adc_to_millivolts() {
        assert_eq!(adc_to_millivolts(0, 3000), 0);
        // Half scale on the pin, x3 divider
        assert_eq!(adc_to_millivolts(2048, 3000), 4950);
        assert_eq!(adc_to_millivolts(2048, 1000), 1650);
    }

    #[test]
    fn test_saturates() {
        assert_eq!(adc_to_millivolts(4095, 60_000), u16::MAX);
    }
}
