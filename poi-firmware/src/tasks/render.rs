//! Render task
//!
//! Owns the LED strip. Each iteration asks the [`RenderDriver`] what to do,
//! draws one frame, and sleeps until the next one is due. The driver applies
//! the consumer-side mode transitions; this task only carries them out.

use defmt::*;
use embassy_time::{Instant, Timer};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use smart_leds::RGB8;

use poi_core::button::{ButtonEvent, MenuAction};
use poi_core::config::PoiConfig;
use poi_core::control::next_bank;
use poi_core::render::effects::{draw_column, draw_rainbow, draw_stream};
use poi_core::render::pacing::{
    pattern_step_ms, stream_period_us, FALLBACK_FRAME_MS, MIN_YIELD_MS, PARK_POLL_MS,
};
use poi_core::render::{
    PatternPlayer, RenderDriver, RenderStep, Scanner, StreamWatchdog, MAX_COLUMN_LEN,
};
use poi_core::shuffle::Shuffle;
use poi_core::state::{Mode, ModeEvent};
use poi_core::traits::PixelSink;
use poi_protocol::frame::MAX_PAYLOAD;

use crate::channels::{
    self, SharedFlash, MENU_EVENTS, SETTINGS_DIRTY, SHARED, SHUFFLE_RESTART, STREAM_RING,
};
use crate::tasks::uptime_ms;
use crate::{Strip, STRIP_PIXELS};

/// Brightness restored by the three-tap menu action
const SAFE_BRIGHTNESS: u8 = 100;

/// How long a menu indicator color stays on the strip
const INDICATOR_MS: u64 = 300;

const ARMED_COLOR: RGB8 = RGB8::new(40, 40, 40);
const LEAVE_STREAM_COLOR: RGB8 = RGB8::new(0, 40, 0);
const NEXT_BANK_COLOR: RGB8 = RGB8::new(0, 0, 40);
const RESET_BRIGHTNESS_COLOR: RGB8 = RGB8::new(40, 40, 0);

/// Per-task drawing state
struct Renderer {
    strip: Strip,
    pixels: [RGB8; STRIP_PIXELS],
    player: PatternPlayer,
    scanner: Scanner,
    shuffle: Shuffle,
    rng: SmallRng,
    fallback_frame: u32,
}

impl Renderer {
    fn active_len(&self) -> usize {
        self.strip.len().min(STRIP_PIXELS)
    }

    /// Active part of the pixel buffer
    fn out(&mut self) -> &mut [RGB8] {
        let len = self.active_len();
        &mut self.pixels[..len]
    }

    async fn show(&mut self) {
        let len = self.active_len();
        self.strip.write(&self.pixels[..len]).await;
    }

    async fn indicate(&mut self, color: RGB8) {
        self.out().fill(color);
        self.show().await;
        Timer::after_millis(INDICATOR_MS).await;
    }

    /// Pop one stream frame and draw it; an empty ring keeps the last frame
    async fn stream(&mut self, brightness: u8) -> u32 {
        let mut frame = [0u8; MAX_PAYLOAD];
        let len = STREAM_RING.lock(|ring| {
            ring.borrow_mut()
                .pop()
                .map(|view| view.copy_to(&mut frame))
        });
        if let Some(len) = len {
            draw_stream(&frame[..len], brightness, self.out());
            self.show().await;
        }
        stream_period_us(SHARED.stream_rate_hz())
    }

    /// Draw one pattern column, falling back to the rainbow
    async fn pattern(&mut self, flash: &'static SharedFlash, mut reload: bool) -> u32 {
        let now = uptime_ms();
        if SHUFFLE_RESTART.try_take().is_some() {
            self.shuffle.restart(now);
        }
        let rng = &mut self.rng;
        let shuffle = &mut self.shuffle;
        if channels::update_settings(|settings| shuffle.tick(settings, now, || rng.next_u32())) {
            debug!("Shuffle picked a new slot");
            reload = true;
        }

        let settings = channels::settings();
        let mut column = [0u8; MAX_COLUMN_LEN];
        let drawn = {
            let mut store = flash.lock().await;
            if reload || !self.player.is_loaded() {
                let slot = settings.pattern_slot();
                match self.player.load(&mut *store, slot).await {
                    Ok(info) => info!(
                        "Playing bank {} slot {}: {} rows, {} bytes",
                        slot.bank, slot.slot, info.rows, info.len
                    ),
                    Err(e) if reload => {
                        info!(
                            "Slot {}/{} unusable ({:?}), showing rainbow",
                            slot.bank, slot.slot, e
                        )
                    }
                    Err(_) => {}
                }
            }
            self.player
                .next_column(&mut *store, &mut column)
                .await
                .map(|bytes| bytes.len())
        };

        let brightness = settings.brightness;
        match drawn {
            Some(len) => {
                draw_column(&column[..len], brightness, self.out());
                self.show().await;
                pattern_step_ms(settings.speed()) * 1000
            }
            None => {
                let frame = self.fallback_frame;
                self.fallback_frame = frame.wrapping_add(1);
                draw_rainbow(frame, brightness, self.out());
                self.show().await;
                FALLBACK_FRAME_MS * 1000
            }
        }
    }

    async fn park(&mut self, entered: bool) -> u32 {
        if entered {
            self.player.unload();
            info!("Render parked for upload");
        }
        let len = self.active_len();
        self.scanner.step(&mut self.pixels[..len]);
        self.show().await;
        PARK_POLL_MS * 1000
    }

    async fn on_menu(&mut self, event: ButtonEvent) {
        match event {
            ButtonEvent::MenuArmed => {
                info!("Menu armed");
                self.indicate(ARMED_COLOR).await;
            }
            ButtonEvent::Action(MenuAction::LeaveStream) => {
                if SHARED.mode() == Mode::Streaming {
                    let (from, to) = SHARED.apply(ModeEvent::StopStream);
                    STREAM_RING.lock(|ring| ring.borrow_mut().clear());
                    info!("Menu: {:?} -> {:?}", from, to);
                }
                self.indicate(LEAVE_STREAM_COLOR).await;
            }
            ButtonEvent::Action(MenuAction::NextBank) => {
                let bank = channels::update_settings(|settings| {
                    next_bank(settings);
                    settings.bank
                });
                SHARED.request_reload();
                SETTINGS_DIRTY.signal(());
                info!("Menu: bank {}", bank);
                self.indicate(NEXT_BANK_COLOR).await;
            }
            ButtonEvent::Action(MenuAction::ResetBrightness) => {
                channels::update_settings(|settings| settings.brightness = SAFE_BRIGHTNESS);
                SETTINGS_DIRTY.signal(());
                info!("Menu: brightness reset");
                self.indicate(RESET_BRIGHTNESS_COLOR).await;
            }
        }
    }
}

#[embassy_executor::task]
pub async fn render_task(strip: Strip, flash: &'static SharedFlash, config: &'static PoiConfig) {
    info!("Render task started ({} pixels)", strip.len());

    let mut driver = RenderDriver::new(StreamWatchdog::new(config.stream.watchdog_ms));
    let mut renderer = Renderer {
        strip,
        pixels: [RGB8::default(); STRIP_PIXELS],
        player: PatternPlayer::new(),
        scanner: Scanner::new(),
        shuffle: Shuffle::new(uptime_ms()),
        rng: SmallRng::seed_from_u64(Instant::now().as_ticks()),
        fallback_frame: 0,
    };

    loop {
        // Menu actions are ignored while parked so the strip stays on the scanner
        if !SHARED.gate.pause_requested() {
            if let Ok(event) = MENU_EVENTS.try_receive() {
                renderer.on_menu(event).await;
            }
        }

        let decision = driver.step(&SHARED, uptime_ms());
        if let Some((event, from, to)) = decision.transition {
            info!("Mode {:?} -> {:?} ({:?})", from, to, event);
        }

        let delay_us = match decision.step {
            RenderStep::Park { entered } => renderer.park(entered).await,
            RenderStep::Stream => renderer.stream(channels::settings().brightness).await,
            RenderStep::Pattern { reload } => renderer.pattern(flash, reload).await,
        };

        Timer::after_micros(u64::from(delay_us.max(MIN_YIELD_MS * 1000))).await;
    }
}
