//! Recording GPIO fake for tests

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use parking_lot::Mutex;

use super::{Edge, EdgeHandler, Gpio, Level, Line};

/// In-memory GPIO with scriptable input levels and manual edge triggering.
#[derive(Default)]
pub struct FakeGpio {
    levels: Mutex<HashMap<Line, Level>>,
    writes: Mutex<Vec<(Line, Level)>>,
    handlers: Mutex<HashMap<Line, EdgeHandler>>,
}

impl FakeGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the level a subsequent `read` will observe.
    pub fn set_level(&self, line: Line, level: Level) {
        self.levels.lock().insert(line, level);
    }

    /// Fire the registered edge handler for a line, as the hardware would.
    pub fn trigger_edge(&self, line: Line) {
        let handler = self.handlers.lock().get(&line).cloned();
        if let Some(handler) = handler {
            handler(line, Instant::now());
        }
    }

    /// The last level written to a line, if any.
    pub fn last_write(&self, line: Line) -> Option<Level> {
        self.writes
            .lock()
            .iter()
            .rev()
            .find(|(l, _)| *l == line)
            .map(|(_, level)| *level)
    }
}

impl Gpio for FakeGpio {
    fn read(&self, line: Line) -> Level {
        self.levels.lock().get(&line).copied().unwrap_or(Level::High)
    }

    fn write(&self, line: Line, level: Level) {
        self.writes.lock().push((line, level));
    }

    fn register_edge_handler(
        &self,
        line: Line,
        _edge: Edge,
        _hardware_debounce: Option<Duration>,
        handler: EdgeHandler,
    ) -> Result<()> {
        self.handlers.lock().insert(line, handler);
        Ok(())
    }
}
