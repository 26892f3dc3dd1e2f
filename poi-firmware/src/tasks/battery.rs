//! Battery sampling task

use defmt::*;
use embassy_time::Timer;
use portable_atomic::Ordering;

use poi_core::traits::BatterySensor;
use poi_hal_rp2040::adc::BatteryAdc;

use crate::channels::BATTERY_MV;

#[embassy_executor::task]
pub async fn battery_task(mut sensor: BatteryAdc<'static>, interval_s: u16) {
    info!("Battery task started");

    loop {
        match sensor.read_millivolts().await {
            Some(mv) => {
                BATTERY_MV.store(mv, Ordering::Relaxed);
                trace!("Battery: {}mV", mv);
            }
            None => warn!("Battery read failed"),
        }
        Timer::after_secs(u64::from(interval_s.max(1))).await;
    }
}
