//! Battery voltage sense on the RP2040 ADC
//!
//! RP2040 ADC inputs:
//! - ADC0: GPIO26
//! - ADC1: GPIO27
//! - ADC2: GPIO28
//! - ADC3: GPIO29 (VSYS/3 on the Pico W, shared with the radio SPI clock)

use embassy_rp::adc::{Adc, Async, Channel};

use poi_core::traits::battery::{adc_to_millivolts, BatterySensor};

/// Conversions averaged per reading
const SAMPLES: u32 = 4;

/// Battery divider tap on an ADC pin
pub struct BatteryAdc<'d> {
    adc: Adc<'d, Async>,
    channel: Channel<'d>,
    divider_x1000: u16,
}

impl<'d> BatteryAdc<'d> {
    pub fn new(adc: Adc<'d, Async>, channel: Channel<'d>, divider_x1000: u16) -> Self {
        Self {
            adc,
            channel,
            divider_x1000,
        }
    }
}

impl BatterySensor for BatteryAdc<'_> {
    async fn read_millivolts(&mut self) -> Option<u16> {
        let mut sum = 0u32;
        for _ in 0..SAMPLES {
            sum += u32::from(self.adc.read(&mut self.channel).await.ok()?);
        }
        Some(adc_to_millivolts((sum / SAMPLES) as u16, self.divider_x1000))
    }
}
