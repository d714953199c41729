//! Physical input wiring
//!
//! Connects the hardware edge layer to the router: every configured line
//! gets a debounced handler that decodes (for encoder CLK lines) and
//! enqueues an [`InputEvent`] for the tick loop. Handlers run on the
//! interrupt thread and only ever debounce, decode, and send; backend
//! traffic happens elsewhere.

pub mod debounce;
pub mod decoder;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::config::{PinConfig, TimingConfig};
use crate::gpio::{Edge, EdgeHandler, Gpio, Line};
use debounce::DebouncedEdgeSource;
use decoder::{Direction, QuadratureDecoder};

/// A decoded, debounced control event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Volume encoder detent.
    Volume(Direction),
    /// Track encoder detent.
    Track(Direction),
    /// Volume encoder push-switch: play/pause toggle.
    PlayPause,
    /// Track encoder push-switch: mute toggle.
    Mute,
    /// Dedicated shutdown button.
    Shutdown,
}

/// Register all debounced handlers on `gpio`.
///
/// Fails only when a line cannot be claimed, which is an unrecoverable
/// startup condition.
pub fn attach(
    gpio: &Arc<dyn Gpio>,
    pins: &PinConfig,
    timing: &TimingConfig,
    events: mpsc::UnboundedSender<InputEvent>,
) -> Result<()> {
    let source = Arc::new(DebouncedEdgeSource::new());
    let encoder_window = Duration::from_millis(timing.encoder_debounce_ms);
    let switch_window = Duration::from_millis(timing.switch_debounce_ms);

    attach_encoder(
        gpio,
        &source,
        Line(pins.volume_clk),
        Line(pins.volume_dt),
        encoder_window,
        events.clone(),
        InputEvent::Volume,
    )?;
    attach_encoder(
        gpio,
        &source,
        Line(pins.track_clk),
        Line(pins.track_dt),
        encoder_window,
        events.clone(),
        InputEvent::Track,
    )?;

    attach_button(gpio, &source, Line(pins.volume_sw), switch_window, events.clone(), InputEvent::PlayPause)?;
    attach_button(gpio, &source, Line(pins.track_sw), switch_window, events.clone(), InputEvent::Mute)?;
    attach_button(gpio, &source, Line(pins.shutdown_sw), switch_window, events, InputEvent::Shutdown)?;

    Ok(())
}

fn attach_encoder(
    gpio: &Arc<dyn Gpio>,
    source: &Arc<DebouncedEdgeSource>,
    clk: Line,
    dt: Line,
    window: Duration,
    events: mpsc::UnboundedSender<InputEvent>,
    wrap: fn(Direction) -> InputEvent,
) -> Result<()> {
    source.add_line(clk, window);
    let decoder = Arc::new(QuadratureDecoder::new(clk, dt, gpio.read(clk)));

    let handler: EdgeHandler = {
        let source = Arc::clone(source);
        let gpio = Arc::clone(gpio);
        Arc::new(move |line, at| {
            if !source.accept(line, at) {
                return;
            }
            if let Some(direction) = decoder.on_clk_edge(gpio.as_ref()) {
                // Receiver gone means we are shutting down; drop the event.
                let _ = events.send(wrap(direction));
            }
        })
    };
    gpio.register_edge_handler(clk, Edge::Falling, Some(window), handler)
}

fn attach_button(
    gpio: &Arc<dyn Gpio>,
    source: &Arc<DebouncedEdgeSource>,
    line: Line,
    window: Duration,
    events: mpsc::UnboundedSender<InputEvent>,
    event: InputEvent,
) -> Result<()> {
    source.add_line(line, window);
    let handler: EdgeHandler = {
        let source = Arc::clone(source);
        Arc::new(move |line, at| {
            if source.accept(line, at) {
                let _ = events.send(event);
            }
        })
    };
    gpio.register_edge_handler(line, Edge::Falling, Some(window), handler)
}
