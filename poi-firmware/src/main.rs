//! Pixel Poi - LED Poi Firmware
//!
//! Main firmware binary for the Raspberry Pi Pico W. Receives commands,
//! live stream frames and pattern uploads over BLE and renders them on a
//! WS2812 strip.

#![no_std]
#![no_main]

use bt_hci::controller::ExternalController;
use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, Config as AdcConfig, InterruptHandler as AdcInterruptHandler};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{DMA_CH0, PIO0, PIO1};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::pio_programs::ws2812::PioWs2812Program;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use poi_core::config::PoiConfig;
use poi_core::traits::PatternStore;
use poi_hal_rp2040::adc::BatteryAdc;
use poi_hal_rp2040::ws2812::Ws2812Strip;
use poi_hal_rp2040::PoiFlash;

use crate::channels::{SharedFlash, SETTINGS, SHARED};

mod ble;
mod channels;
mod config;
mod tasks;

include!(concat!(env!("OUT_DIR"), "/strip.rs"));

/// Embedded board configuration (compiled into firmware)
/// Edit poi.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../poi.toml");

/// WS2812 strip on PIO1 state machine 0
pub type Strip = Ws2812Strip<'static, PIO1, 0, STRIP_PIXELS>;

// CYW43 blobs live in flash at fixed addresses, outside the firmware image.
// Flash them once with:
//   probe-rs download 43439A0.bin --binary-format bin --chip RP2040 --base-address 0x10100000
//   probe-rs download 43439A0_clm.bin --binary-format bin --chip RP2040 --base-address 0x10140000
//   probe-rs download 43439A0_btfw.bin --binary-format bin --chip RP2040 --base-address 0x10141400
const WIFI_FW_ADDR: usize = 0x1010_0000;
const WIFI_FW_LEN: usize = 230_321;
const CLM_ADDR: usize = 0x1014_0000;
const CLM_LEN: usize = 4752;
const BT_FW_ADDR: usize = 0x1014_1400;
const BT_FW_LEN: usize = 6164;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
    PIO1_IRQ_0 => PioInterruptHandler<PIO1>;
    ADC_IRQ_FIFO => AdcInterruptHandler;
});

// Static cells (must live forever for task references)
static POI_CONFIG: StaticCell<PoiConfig> = StaticCell::new();
static FLASH: StaticCell<SharedFlash> = StaticCell::new();
static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Pixel Poi firmware starting...");

    let p = embassy_rp::init(Default::default());

    let config: &'static PoiConfig = POI_CONFIG.init(config::load_board_config(EMBEDDED_CONFIG));
    SHARED.set_stream_rate(config.stream.default_rate_hz);

    // Flash: settings first, then free space for the config reply
    let mut flash = PoiFlash::new(p.FLASH, p.DMA_CH1);
    let settings = config::load_settings(&mut flash).await;
    SETTINGS.lock(|s| s.set(settings));
    channels::set_free_bytes(flash.free_bytes().await);
    info!("Pattern storage: {}KB free", channels::free_kb());
    let flash: &'static SharedFlash = FLASH.init(Mutex::new(flash));

    // Radio
    let (fw, clm, btfw) = radio_blobs();
    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio0 = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio0.common,
        pio0.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio0.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );
    let state = CYW43_STATE.init(cyw43::State::new());
    let (_net, bt_device, mut control, runner) =
        cyw43::new_with_bluetooth(state, pwr, spi, fw, btfw).await;
    spawner.spawn(cyw43_task(runner)).unwrap();
    control.init(clm).await;
    info!("Radio initialized");

    let controller: tasks::BleController = ExternalController::new(bt_device);

    // LED strip
    let mut pio1 = Pio::new(p.PIO1, Irqs);
    let program = PioWs2812Program::new(&mut pio1.common);
    let strip: Strip = Ws2812Strip::new(
        &mut pio1.common,
        pio1.sm0,
        p.DMA_CH2,
        p.PIN_16,
        &program,
        usize::from(config.strip.pixels),
    );

    // Mode button
    let pull = if config.button.pull_up { Pull::Up } else { Pull::None };
    let button = Input::new(p.PIN_15, pull);

    // Battery divider tap on ADC2
    let adc = Adc::new(p.ADC, Irqs, AdcConfig::default());
    let battery = BatteryAdc::new(
        adc,
        Channel::new_pin(p.PIN_28, Pull::None),
        config.battery.divider_x1000,
    );

    spawner.spawn(tasks::storage_task(flash)).unwrap();
    spawner.spawn(tasks::render_task(strip, flash, config)).unwrap();
    spawner.spawn(tasks::ble_task(controller, config)).unwrap();
    spawner
        .spawn(tasks::button_task(button, config.button.inverted))
        .unwrap();
    spawner.spawn(tasks::menu_task(config.button)).unwrap();
    spawner
        .spawn(tasks::battery_task(battery, config.battery.interval_s))
        .unwrap();

    info!("All tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

#[embassy_executor::task]
async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

/// Radio firmware, CLM and Bluetooth firmware from their flash addresses
fn radio_blobs() -> (&'static [u8], &'static [u8], &'static [u8]) {
    // SAFETY: XIP flash is mapped read-only for the lifetime of the program
    // and these ranges lie outside the firmware image and the data partitions.
    unsafe {
        (
            core::slice::from_raw_parts(WIFI_FW_ADDR as *const u8, WIFI_FW_LEN),
            core::slice::from_raw_parts(CLM_ADDR as *const u8, CLM_LEN),
            core::slice::from_raw_parts(BT_FW_ADDR as *const u8, BT_FW_LEN),
        )
    }
}
