//! WS2812 strip on a PIO state machine
//!
//! Wraps embassy-rp's `PioWs2812` driver. `N` is the compile-time buffer
//! size; the strip may use fewer pixels than that, and the rest stay dark.

use embassy_rp::dma::Channel;
use embassy_rp::pio::{Common, Instance, PioPin, StateMachine};
use embassy_rp::pio_programs::ws2812::{Grb, PioWs2812, PioWs2812Program};
use embassy_rp::Peri;
use smart_leds::RGB8;

use poi_core::traits::PixelSink;

pub struct Ws2812Strip<'d, P: Instance, const S: usize, const N: usize> {
    driver: PioWs2812<'d, P, S, N, Grb>,
    frame: [RGB8; N],
    active: usize,
}

impl<'d, P: Instance, const S: usize, const N: usize> Ws2812Strip<'d, P, S, N> {
    /// Create a strip driving `active` pixels on `pin`
    pub fn new(
        common: &mut Common<'d, P>,
        sm: StateMachine<'d, P, S>,
        dma: Peri<'d, impl Channel>,
        pin: Peri<'d, impl PioPin>,
        program: &PioWs2812Program<'d, P>,
        active: usize,
    ) -> Self {
        Self {
            driver: PioWs2812::new(common, sm, dma, pin, program),
            frame: [RGB8::default(); N],
            active: active.min(N),
        }
    }
}

impl<P: Instance, const S: usize, const N: usize> PixelSink for Ws2812Strip<'_, P, S, N> {
    fn len(&self) -> usize {
        self.active
    }

    async fn write(&mut self, colors: &[RGB8]) {
        let count = colors.len().min(self.active);
        self.frame[..count].copy_from_slice(&colors[..count]);
        self.frame[count..].fill(RGB8::default());
        self.driver.write(&self.frame).await;
    }
}
