//! Tri-color status LED
//!
//! Each tick the orchestrator derives a [`LedPlan`] from the connection
//! phase and the latest playback snapshot, then renders it against the 1 Hz
//! toggle bit. The mapping is a pure function: same inputs, same plan.

use std::sync::Arc;

use crate::backend::connection::ConnectionPhase;
use crate::backend::{PlaybackSnapshot, PlayerState};
use crate::config::PinConfig;
use crate::gpio::{Gpio, Level, Line};

/// Per-channel command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Off,
    On,
    Blink,
}

impl LedMode {
    /// Level to drive for this mode given the current toggle bit.
    pub fn level(self, toggle: bool) -> Level {
        match self {
            LedMode::Off => Level::Low,
            LedMode::On => Level::High,
            LedMode::Blink => Level::from_bool(toggle),
        }
    }
}

/// One command per channel, derived fresh each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedPlan {
    pub red: LedMode,
    pub green: LedMode,
    pub blue: LedMode,
}

impl LedPlan {
    pub const ALL_OFF: LedPlan = LedPlan {
        red: LedMode::Off,
        green: LedMode::Off,
        blue: LedMode::Off,
    };

    /// Status mapping, in priority order: connecting blinks blue, playing
    /// blinks green, paused holds red, anything else is dark.
    pub fn for_status(phase: ConnectionPhase, playback: Option<&PlaybackSnapshot>) -> LedPlan {
        match phase {
            ConnectionPhase::Connecting => LedPlan {
                red: LedMode::Off,
                green: LedMode::Off,
                blue: LedMode::Blink,
            },
            ConnectionPhase::Connected => match playback.map(|s| s.state) {
                Some(PlayerState::Playing) => LedPlan {
                    red: LedMode::Off,
                    green: LedMode::Blink,
                    blue: LedMode::Off,
                },
                Some(PlayerState::Paused) => LedPlan {
                    red: LedMode::On,
                    green: LedMode::Off,
                    blue: LedMode::Off,
                },
                _ => LedPlan::ALL_OFF,
            },
            ConnectionPhase::Stalled | ConnectionPhase::Disconnected => LedPlan::ALL_OFF,
        }
    }
}

/// Renders plans onto the three LED lines.
pub struct LedDriver {
    gpio: Arc<dyn Gpio>,
    red: Line,
    green: Line,
    blue: Line,
}

impl LedDriver {
    pub fn new(gpio: Arc<dyn Gpio>, pins: &PinConfig) -> Self {
        Self {
            gpio,
            red: Line(pins.led_red),
            green: Line(pins.led_green),
            blue: Line(pins.led_blue),
        }
    }

    pub fn render(&self, plan: LedPlan, toggle: bool) {
        self.gpio.write(self.red, plan.red.level(toggle));
        self.gpio.write(self.green, plan.green.level(toggle));
        self.gpio.write(self.blue, plan.blue.level(toggle));
    }

    /// Immediate red/green override on a play/pause press; the next
    /// status-driven tick reconciles.
    pub fn show_pause(&self, paused: bool) {
        self.gpio.write(self.red, Level::from_bool(paused));
        self.gpio.write(self.green, Level::from_bool(!paused));
    }

    /// Teardown: always leave the LED dark.
    pub fn clear(&self) {
        self.render(LedPlan::ALL_OFF, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::snapshot;
    use crate::gpio::fake::FakeGpio;

    fn driver() -> (Arc<FakeGpio>, LedDriver, PinConfig) {
        let fake = Arc::new(FakeGpio::new());
        let pins = PinConfig::default();
        let driver = LedDriver::new(fake.clone(), &pins);
        (fake, driver, pins)
    }

    #[test]
    fn connecting_blinks_blue_only() {
        let plan = LedPlan::for_status(ConnectionPhase::Connecting, None);
        assert_eq!(plan.red, LedMode::Off);
        assert_eq!(plan.green, LedMode::Off);
        assert_eq!(plan.blue, LedMode::Blink);
    }

    #[test]
    fn connected_playing_blinks_green() {
        let snap = snapshot(PlayerState::Playing, true);
        let plan = LedPlan::for_status(ConnectionPhase::Connected, Some(&snap));
        assert_eq!(
            plan,
            LedPlan {
                red: LedMode::Off,
                green: LedMode::Blink,
                blue: LedMode::Off
            }
        );
    }

    #[test]
    fn connected_paused_holds_red() {
        let snap = snapshot(PlayerState::Paused, true);
        let plan = LedPlan::for_status(ConnectionPhase::Connected, Some(&snap));
        assert_eq!(
            plan,
            LedPlan {
                red: LedMode::On,
                green: LedMode::Off,
                blue: LedMode::Off
            }
        );
    }

    #[test]
    fn everything_else_is_dark() {
        let stopped = snapshot(PlayerState::Stopped, false);
        assert_eq!(
            LedPlan::for_status(ConnectionPhase::Connected, Some(&stopped)),
            LedPlan::ALL_OFF
        );
        assert_eq!(
            LedPlan::for_status(ConnectionPhase::Connected, None),
            LedPlan::ALL_OFF
        );
        assert_eq!(
            LedPlan::for_status(ConnectionPhase::Stalled, None),
            LedPlan::ALL_OFF
        );
        assert_eq!(
            LedPlan::for_status(ConnectionPhase::Disconnected, None),
            LedPlan::ALL_OFF
        );
    }

    #[test]
    fn blink_follows_the_toggle_bit() {
        assert_eq!(LedMode::Blink.level(true), Level::High);
        assert_eq!(LedMode::Blink.level(false), Level::Low);
        assert_eq!(LedMode::On.level(false), Level::High);
        assert_eq!(LedMode::Off.level(true), Level::Low);
    }

    #[test]
    fn render_drives_all_three_lines() {
        let (gpio, driver, pins) = driver();
        let snap = snapshot(PlayerState::Playing, true);
        driver.render(
            LedPlan::for_status(ConnectionPhase::Connected, Some(&snap)),
            true,
        );
        assert_eq!(gpio.last_write(Line(pins.led_red)), Some(Level::Low));
        assert_eq!(gpio.last_write(Line(pins.led_green)), Some(Level::High));
        assert_eq!(gpio.last_write(Line(pins.led_blue)), Some(Level::Low));
    }

    #[test]
    fn pause_override_flips_red_and_green() {
        let (gpio, driver, pins) = driver();
        driver.show_pause(true);
        assert_eq!(gpio.last_write(Line(pins.led_red)), Some(Level::High));
        assert_eq!(gpio.last_write(Line(pins.led_green)), Some(Level::Low));

        driver.show_pause(false);
        assert_eq!(gpio.last_write(Line(pins.led_red)), Some(Level::Low));
        assert_eq!(gpio.last_write(Line(pins.led_green)), Some(Level::High));
    }

    #[test]
    fn clear_turns_everything_off() {
        let (gpio, driver, pins) = driver();
        driver.show_pause(false);
        driver.clear();
        assert_eq!(gpio.last_write(Line(pins.led_red)), Some(Level::Low));
        assert_eq!(gpio.last_write(Line(pins.led_green)), Some(Level::Low));
        assert_eq!(gpio.last_write(Line(pins.led_blue)), Some(Level::Low));
    }
}
