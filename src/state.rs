//! Shared state groups
//!
//! Each logical group gets its own lock so a slow backend call on the tick
//! loop can never stall edge decoding: volume, the latest playback snapshot,
//! and the pause flag are independent cells passed around as `Arc` handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::PlaybackSnapshot;

/// Volume ceiling enforced everywhere.
pub const VOLUME_MAX: u8 = 100;

/// Volume applied when the persisted value is missing or unreadable.
pub const DEFAULT_VOLUME: u8 = 50;

/// Current and persisted volume plus mute bookkeeping.
///
/// Invariants: `current <= 100`; while muted, `current == 0` and
/// `pre_mute_level` holds the level to restore.
#[derive(Debug)]
pub struct VolumeState {
    current: u8,
    last_persisted: u8,
    muted: bool,
    pre_mute_level: u8,
}

pub type SharedVolume = Arc<Mutex<VolumeState>>;

/// Latest heartbeat snapshot, superseded each tick. `None` until the first
/// successful status query and cleared on disconnect.
pub type SharedStatus = Arc<Mutex<Option<PlaybackSnapshot>>>;

impl VolumeState {
    pub fn new(initial: u8) -> Self {
        let clamped = initial.min(VOLUME_MAX);
        Self {
            current: clamped,
            last_persisted: clamped,
            muted: false,
            pre_mute_level: clamped,
        }
    }

    pub fn shared(initial: u8) -> SharedVolume {
        Arc::new(Mutex::new(Self::new(initial)))
    }

    pub fn current(&self) -> u8 {
        self.current
    }

    pub fn last_persisted(&self) -> u8 {
        self.last_persisted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// True when the current value has not been written to storage yet.
    pub fn is_dirty(&self) -> bool {
        self.current != self.last_persisted
    }

    /// Record that `value` was written to durable storage.
    pub fn mark_persisted(&mut self, value: u8) {
        self.last_persisted = value.min(VOLUME_MAX);
    }

    /// Step the volume up, clamped to 100. Turning the knob while muted
    /// unmutes first. Returns the new level if it changed.
    pub fn increase(&mut self, step: u8) -> Option<u8> {
        self.muted = false;
        let next = self.current.saturating_add(step).min(VOLUME_MAX);
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }

    /// Step the volume down, clamped to 0. Returns the new level if it
    /// changed.
    pub fn decrease(&mut self, step: u8) -> Option<u8> {
        self.muted = false;
        let next = self.current.saturating_sub(step);
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }

    /// Flip mute. Returns the level to send to the backend: 0 when muting,
    /// the remembered level when unmuting.
    pub fn toggle_mute(&mut self) -> u8 {
        if self.muted {
            self.muted = false;
            self.current = self.pre_mute_level;
        } else {
            self.pre_mute_level = self.current;
            self.muted = true;
            self.current = 0;
        }
        self.current
    }

    /// Reset the live level to the last persisted one (connection restore
    /// path). Clears mute.
    pub fn restore_persisted(&mut self) -> u8 {
        self.muted = false;
        self.current = self.last_persisted;
        self.current
    }
}

/// Play/pause toggle shared between the router (writer on button press) and
/// the heartbeat (reconciles from observed playback state).
#[derive(Debug, Default)]
pub struct PauseFlag(AtomicBool);

impl PauseFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, paused: bool) {
        self.0.store(paused, Ordering::Release);
    }

    /// Flip the flag and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_settles_at_100_and_further_increments_are_noops() {
        let mut vol = VolumeState::new(98);
        assert_eq!(vol.increase(5), Some(100));
        assert_eq!(vol.increase(5), None);
        assert_eq!(vol.increase(5), None);
        assert_eq!(vol.current(), 100);
    }

    #[test]
    fn volume_settles_at_0() {
        let mut vol = VolumeState::new(3);
        assert_eq!(vol.decrease(5), Some(0));
        assert_eq!(vol.decrease(5), None);
        assert_eq!(vol.current(), 0);
    }

    #[test]
    fn initial_volume_is_clamped() {
        let vol = VolumeState::new(250);
        assert_eq!(vol.current(), 100);
    }

    #[test]
    fn mute_round_trip_holds_invariant() {
        let mut vol = VolumeState::new(60);
        assert_eq!(vol.toggle_mute(), 0);
        assert!(vol.is_muted());
        assert_eq!(vol.current(), 0);
        assert_eq!(vol.toggle_mute(), 60);
        assert!(!vol.is_muted());
        assert_eq!(vol.current(), 60);
    }

    #[test]
    fn turning_the_knob_while_muted_unmutes() {
        let mut vol = VolumeState::new(60);
        vol.toggle_mute();
        assert_eq!(vol.increase(5), Some(5));
        assert!(!vol.is_muted());
    }

    #[test]
    fn dirty_tracking_follows_persist_marks() {
        let mut vol = VolumeState::new(50);
        assert!(!vol.is_dirty());
        vol.increase(5);
        assert!(vol.is_dirty());
        vol.mark_persisted(55);
        assert!(!vol.is_dirty());
        assert_eq!(vol.last_persisted(), 55);
    }

    #[test]
    fn restore_persisted_resets_to_stored_level() {
        let mut vol = VolumeState::new(40);
        vol.increase(10);
        assert_eq!(vol.restore_persisted(), 40);
        assert_eq!(vol.current(), 40);
    }

    #[test]
    fn pause_flag_toggles() {
        let flag = PauseFlag::new();
        assert!(!flag.is_paused());
        assert!(flag.toggle());
        assert!(flag.is_paused());
        assert!(!flag.toggle());
        assert!(!flag.is_paused());
    }
}
