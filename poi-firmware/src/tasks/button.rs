//! Mode button tasks
//!
//! `button_task` only timestamps edges. `menu_task` feeds them to the
//! [`PressClassifier`] and polls its timers, forwarding menu events to the
//! render task.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use embassy_time::Timer;

use poi_core::button::{ButtonEdge, PressClassifier};
use poi_core::config::ButtonConfig;

use crate::channels::{BUTTON_EDGES, MENU_EVENTS};
use crate::tasks::uptime_ms;

/// Classifier poll interval
const POLL_MS: u64 = 20;

#[embassy_executor::task]
pub async fn button_task(mut pin: Input<'static>, inverted: bool) {
    info!("Button task started");

    loop {
        pin.wait_for_any_edge().await;
        let pressed = pin.is_low() == inverted;
        let edge = ButtonEdge {
            pressed,
            at_ms: uptime_ms(),
        };
        if BUTTON_EDGES.try_send(edge).is_err() {
            trace!("Button edge dropped");
        }
    }
}

#[embassy_executor::task]
pub async fn menu_task(config: ButtonConfig) {
    let mut classifier = PressClassifier::new(&config);

    loop {
        let received = select(BUTTON_EDGES.receive(), Timer::after_millis(POLL_MS)).await;
        if let Either::First(edge) = received {
            classifier.on_edge(edge);
        }
        if let Some(event) = classifier.poll(uptime_ms()) {
            debug!("Button: {:?}", event);
            if MENU_EVENTS.try_send(event).is_err() {
                warn!("Menu event dropped");
            }
        }
    }
}
