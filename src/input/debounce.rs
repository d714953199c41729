//! Debounced edge source
//!
//! First stage of the input path: raw falling edges arrive from the hardware
//! layer and pass through a per-line minimum re-trigger interval. Encoder
//! CLK lines use an interval short enough to keep every physical detent
//! (about 1 ms); switch lines use a few hundred milliseconds to swallow
//! contact bounce. Lines never interact.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

use crate::gpio::Line;

#[derive(Debug)]
struct DebounceEntry {
    min_interval: Duration,
    last_accepted: Option<Instant>,
}

/// Per-line re-trigger filter. Called from interrupt-thread handlers, so
/// `accept` must stay lock-short and never block.
#[derive(Default)]
pub struct DebouncedEdgeSource {
    entries: Mutex<HashMap<Line, DebounceEntry>>,
}

impl DebouncedEdgeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start filtering a line with the given minimum interval.
    pub fn add_line(&self, line: Line, min_interval: Duration) {
        self.entries.lock().insert(
            line,
            DebounceEntry {
                min_interval,
                last_accepted: None,
            },
        );
    }

    /// Decide whether an edge at `at` is a stable transition.
    ///
    /// Returns true (and arms the interval) when it is; false when the edge
    /// falls inside the re-trigger window. An unregistered line is a
    /// programming error: it panics in debug builds and is dropped with a
    /// warning in release builds.
    pub fn accept(&self, line: Line, at: Instant) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&line) else {
            debug_assert!(false, "edge on unregistered line {line}");
            warn!("ignoring edge on unregistered line {}", line);
            return false;
        };
        if let Some(last) = entry.last_accepted {
            if at.saturating_duration_since(last) < entry.min_interval {
                return false;
            }
        }
        entry.last_accepted = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LINE: Line = Line(17);
    const MIN: Duration = Duration::from_millis(1);

    fn source() -> DebouncedEdgeSource {
        let src = DebouncedEdgeSource::new();
        src.add_line(LINE, MIN);
        src
    }

    #[test]
    fn edges_inside_the_window_collapse_to_one() {
        let src = source();
        let t0 = Instant::now();
        assert!(src.accept(LINE, t0));
        assert!(!src.accept(LINE, t0 + Duration::from_micros(500)));
    }

    #[test]
    fn edges_outside_the_window_both_pass() {
        let src = source();
        let t0 = Instant::now();
        assert!(src.accept(LINE, t0));
        assert!(src.accept(LINE, t0 + Duration::from_millis(2)));
    }

    #[test]
    fn rejected_edge_does_not_extend_the_window() {
        let src = source();
        let t0 = Instant::now();
        assert!(src.accept(LINE, t0));
        assert!(!src.accept(LINE, t0 + Duration::from_micros(800)));
        // Still measured from t0, not from the rejected edge.
        assert!(src.accept(LINE, t0 + Duration::from_micros(1100)));
    }

    #[test]
    fn lines_are_filtered_independently() {
        let src = source();
        let other = Line(21);
        src.add_line(other, MIN);
        let t0 = Instant::now();
        assert!(src.accept(LINE, t0));
        assert!(src.accept(other, t0));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "unregistered line"))]
    fn unregistered_line_is_a_programming_error() {
        let src = DebouncedEdgeSource::new();
        let accepted = src.accept(Line(99), Instant::now());
        // Release builds fall through to ignore.
        assert!(!accepted);
    }

    proptest! {
        /// Whatever the raw edge timing, accepted edges are always spaced at
        /// least `min_interval` apart and the first edge always passes.
        #[test]
        fn accepted_edges_respect_the_interval(gaps_us in prop::collection::vec(0u64..5_000, 1..60)) {
            let src = source();
            let mut t = Instant::now();
            let mut last: Option<Instant> = None;
            let mut accepted_any = false;
            for gap in gaps_us {
                if src.accept(LINE, t) {
                    if let Some(prev) = last {
                        prop_assert!(t.saturating_duration_since(prev) >= MIN);
                    }
                    last = Some(t);
                    accepted_any = true;
                }
                t += Duration::from_micros(gap);
            }
            prop_assert!(accepted_any);
        }
    }
}
