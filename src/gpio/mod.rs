//! GPIO hardware abstraction
//!
//! The control surface talks to pins through the [`Gpio`] trait so the rest
//! of the crate never depends on rppal directly. On a Raspberry Pi the `rpi`
//! feature provides [`rpi::RpiGpio`]; everywhere else [`NullGpio`] stands in
//! and logs writes instead of driving hardware.

#[cfg(test)]
pub mod fake;
#[cfg(feature = "rpi")]
pub mod rpi;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;

/// A GPIO line, identified by its BCM pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Line(pub u8);

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// Logic level of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn from_bool(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Edge kind for interrupt registration. Every input in this system is
/// pulled up and triggers on the falling edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Handler invoked by the hardware layer when a registered line fires.
///
/// Handlers run on the platform's interrupt thread at arbitrary times
/// relative to the tick loop: they must not block and must not await.
pub type EdgeHandler = Arc<dyn Fn(Line, Instant) + Send + Sync>;

/// GPIO collaborator interface.
pub trait Gpio: Send + Sync {
    /// Read the current level of an input line.
    fn read(&self, line: Line) -> Level;

    /// Drive an output line.
    fn write(&self, line: Line, level: Level);

    /// Register an edge-triggered handler on an input line.
    ///
    /// `hardware_debounce` is a coarse glitch filter applied by the platform
    /// where supported; the authoritative per-line re-trigger interval lives
    /// in [`crate::input::debounce::DebouncedEdgeSource`].
    fn register_edge_handler(
        &self,
        line: Line,
        edge: Edge,
        hardware_debounce: Option<Duration>,
        handler: EdgeHandler,
    ) -> Result<()>;
}

/// GPIO stub for running off-hardware.
///
/// Reads idle high (all inputs are pulled up), logs writes, and accepts but
/// never fires edge registrations.
pub struct NullGpio;

impl Gpio for NullGpio {
    fn read(&self, _line: Line) -> Level {
        Level::High
    }

    fn write(&self, line: Line, level: Level) {
        debug!("gpio stub: {} <- {:?}", line, level);
    }

    fn register_edge_handler(
        &self,
        line: Line,
        edge: Edge,
        _hardware_debounce: Option<Duration>,
        _handler: EdgeHandler,
    ) -> Result<()> {
        debug!("gpio stub: registered {:?} edge on {}", edge, line);
        Ok(())
    }
}
