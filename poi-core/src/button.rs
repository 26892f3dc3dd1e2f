//! Mode button press classification
//!
//! The GPIO edge handler only timestamps edges. This classifier turns the
//! edge stream into menu actions: a long hold arms the menu, short taps are
//! counted, and the action fires once the button has been quiet long
//! enough after the last tap.

use crate::config::ButtonConfig;

/// Shortest press counted as a tap
pub const MIN_TAP_MS: u32 = 50;

/// Longest press counted as a tap
pub const MAX_TAP_MS: u32 = 500;

/// One debounced edge, timestamped by the interrupt side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEdge {
    pub pressed: bool,
    pub at_ms: u32,
}

/// Menu actions selected by tap count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuAction {
    /// One tap: back to pattern playback
    LeaveStream,
    /// Two taps: next bank
    NextBank,
    /// Three taps: brightness back to a safe level
    ResetBrightness,
}

impl MenuAction {
    fn from_taps(taps: u8) -> Option<Self> {
        match taps {
            1 => Some(MenuAction::LeaveStream),
            2 => Some(MenuAction::NextBank),
            3 => Some(MenuAction::ResetBrightness),
            _ => None,
        }
    }
}

/// Classifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// Long hold detected; taps are now counted
    MenuArmed,
    Action(MenuAction),
}

/// Turns timestamped edges into menu events
#[derive(Debug, Clone)]
pub struct PressClassifier {
    long_press_ms: u32,
    quiet_ms: u32,
    pressed: bool,
    pressed_at: u32,
    last_release: Option<u32>,
    armed: bool,
    taps: u8,
}

impl PressClassifier {
    pub fn new(config: &ButtonConfig) -> Self {
        Self {
            long_press_ms: u32::from(config.long_press_ms),
            quiet_ms: u32::from(config.menu_quiet_ms),
            pressed: false,
            pressed_at: 0,
            last_release: None,
            armed: false,
            taps: 0,
        }
    }

    /// Feed one edge
    pub fn on_edge(&mut self, edge: ButtonEdge) {
        if edge.pressed {
            self.pressed = true;
            self.pressed_at = edge.at_ms;
            return;
        }
        if !self.pressed {
            return;
        }
        self.pressed = false;

        let held = edge.at_ms.wrapping_sub(self.pressed_at);
        if held > MIN_TAP_MS && held < MAX_TAP_MS {
            self.taps = self.taps.saturating_add(1);
        }
        self.last_release = Some(edge.at_ms);
    }

    /// Check timers at uptime `now_ms`
    pub fn poll(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        if self.pressed {
            if !self.armed && now_ms.wrapping_sub(self.pressed_at) > self.long_press_ms {
                self.armed = true;
                self.taps = 0;
                return Some(ButtonEvent::MenuArmed);
            }
            return None;
        }

        let quiet = self
            .last_release
            .is_some_and(|at| now_ms.wrapping_sub(at) > self.quiet_ms);
        if self.armed && quiet {
            let action = MenuAction::from_taps(self.taps);
            self.armed = false;
            self.taps = 0;
            return action.map(ButtonEvent::Action);
        }
        None
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PressClassifier {
        PressClassifier::new(&ButtonConfig::default())
    }

    fn press(c: &mut PressClassifier, at: u32, held: u32) {
        c.on_edge(ButtonEdge { pressed: true, at_ms: at });
        c.on_edge(ButtonEdge {
            pressed: false,
            at_ms: at + held,
        });
    }

    /// Long hold from t=0 to t=1500, polled while held
    fn arm(c: &mut PressClassifier) {
        c.on_edge(ButtonEdge { pressed: true, at_ms: 0 });
        assert_eq!(c.poll(500), None);
        assert_eq!(c.poll(1001), Some(ButtonEvent::MenuArmed));
        c.on_edge(ButtonEdge {
            pressed: false,
            at_ms: 1500,
        });
    }

    #[test]
    fn test_long_press_arms_once() {
        let mut c = classifier();
        c.on_edge(ButtonEdge { pressed: true, at_ms: 0 });
        assert_eq!(c.poll(1001), Some(ButtonEvent::MenuArmed));
        assert_eq!(c.poll(1200), None);
        assert!(c.is_armed());
    }

    #[test]
    fn test_taps_select_action() {
        for (taps, action) in [
            (1, MenuAction::LeaveStream),
            (2, MenuAction::NextBank),
            (3, MenuAction::ResetBrightness),
        ] {
            let mut c = classifier();
            arm(&mut c);
            let mut t = 1700;
            for _ in 0..taps {
                press(&mut c, t, 100);
                t += 300;
            }
            assert_eq!(c.poll(t), None);
            assert_eq!(c.poll(t + 1000), Some(ButtonEvent::Action(action)));
            assert!(!c.is_armed());
        }
    }

    #[test]
    fn test_taps_without_menu_ignored() {
        let mut c = classifier();
        press(&mut c, 0, 100);
        press(&mut c, 300, 100);
        assert_eq!(c.poll(5000), None);
    }

    #[test]
    fn test_bounce_and_slow_presses_not_counted() {
        let mut c = classifier();
        arm(&mut c);
        press(&mut c, 1700, 20);
        press(&mut c, 1800, 700);
        press(&mut c, 2600, 100);
        assert_eq!(
            c.poll(4000),
            Some(ButtonEvent::Action(MenuAction::LeaveStream))
        );
    }

    #[test]
    fn test_no_taps_disarms_silently() {
        let mut c = classifier();
        arm(&mut c);
        assert_eq!(c.poll(2600), None);
        assert!(!c.is_armed());
    }

    #[test]
    fn test_too_many_taps_do_nothing() {
        let mut c = classifier();
        arm(&mut c);
        for i in 0..4 {
            press(&mut c, 1700 + i * 300, 100);
        }
        assert_eq!(c.poll(5000), None);
        assert!(!c.is_armed());
    }
}
