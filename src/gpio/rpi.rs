//! Raspberry Pi GPIO backed by rppal
//!
//! Inputs are claimed with the internal pull-up (encoders and switches pull
//! the line to ground), outputs start low. Edge handlers run on rppal's
//! interrupt thread.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rppal::gpio::{InputPin, OutputPin, Trigger};
use tracing::warn;

use super::{Edge, EdgeHandler, Gpio, Level, Line};

pub struct RpiGpio {
    chip: rppal::gpio::Gpio,
    // Pins must stay claimed for interrupt registrations to stay alive.
    inputs: Mutex<HashMap<Line, InputPin>>,
    outputs: Mutex<HashMap<Line, OutputPin>>,
}

impl RpiGpio {
    pub fn new() -> Result<Self> {
        let chip = rppal::gpio::Gpio::new().context("failed to open GPIO character device")?;
        Ok(Self {
            chip,
            inputs: Mutex::new(HashMap::new()),
            outputs: Mutex::new(HashMap::new()),
        })
    }

    fn claim_input(&self, line: Line) -> Result<()> {
        let mut inputs = self.inputs.lock();
        if !inputs.contains_key(&line) {
            let pin = self
                .chip
                .get(line.0)
                .with_context(|| format!("failed to claim {line}"))?
                .into_input_pullup();
            inputs.insert(line, pin);
        }
        Ok(())
    }
}

impl Gpio for RpiGpio {
    fn read(&self, line: Line) -> Level {
        if let Err(e) = self.claim_input(line) {
            warn!("{e:#}");
            return Level::High;
        }
        let inputs = self.inputs.lock();
        match inputs.get(&line) {
            Some(pin) => Level::from_bool(pin.is_high()),
            None => Level::High,
        }
    }

    fn write(&self, line: Line, level: Level) {
        let mut outputs = self.outputs.lock();
        if !outputs.contains_key(&line) {
            match self.chip.get(line.0) {
                Ok(pin) => {
                    outputs.insert(line, pin.into_output_low());
                },
                Err(e) => {
                    warn!("failed to claim {line} as output: {e}");
                    return;
                },
            }
        }
        if let Some(pin) = outputs.get_mut(&line) {
            match level {
                Level::High => pin.set_high(),
                Level::Low => pin.set_low(),
            }
        }
    }

    fn register_edge_handler(
        &self,
        line: Line,
        edge: Edge,
        hardware_debounce: Option<Duration>,
        handler: EdgeHandler,
    ) -> Result<()> {
        let trigger = match edge {
            Edge::Rising => Trigger::RisingEdge,
            Edge::Falling => Trigger::FallingEdge,
        };
        // Release any plain-input claim from an earlier read; the pin can
        // only be held once.
        self.inputs.lock().remove(&line);
        let mut pin = self
            .chip
            .get(line.0)
            .with_context(|| format!("failed to claim {line}"))?
            .into_input_pullup();
        pin.set_async_interrupt(trigger, hardware_debounce, move |_event| {
            handler(line, std::time::Instant::now());
        })
        .with_context(|| format!("failed to register {edge:?} interrupt on {line}"))?;
        self.inputs.lock().insert(line, pin);
        Ok(())
    }
}
