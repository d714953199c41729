//! Input router
//!
//! Maps decoded control events to domain actions: volume steps with the
//! 0..=100 clamp, guarded track skips, play/pause, mute, shutdown. Backend
//! commands leave as fire-and-forget messages to the command worker, so a
//! momentarily disconnected backend costs a logged failure, never a stall.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::backend::BackendCommand;
use crate::input::decoder::Direction;
use crate::input::InputEvent;
use crate::led::LedDriver;
use crate::state::{PauseFlag, SharedStatus, SharedVolume};

pub struct InputRouter {
    volume: SharedVolume,
    status: SharedStatus,
    paused: Arc<PauseFlag>,
    commands: mpsc::UnboundedSender<BackendCommand>,
    led: Arc<LedDriver>,
    shutdown: mpsc::UnboundedSender<()>,
    volume_step: u8,
}

impl InputRouter {
    pub fn new(
        volume: SharedVolume,
        status: SharedStatus,
        paused: Arc<PauseFlag>,
        commands: mpsc::UnboundedSender<BackendCommand>,
        led: Arc<LedDriver>,
        shutdown: mpsc::UnboundedSender<()>,
        volume_step: u8,
    ) -> Self {
        Self {
            volume,
            status,
            paused,
            commands,
            led,
            shutdown,
            volume_step,
        }
    }

    /// Route one event. Synchronous and non-blocking.
    pub fn handle(&self, event: InputEvent) {
        match event {
            InputEvent::Volume(direction) => self.handle_volume(direction),
            InputEvent::Track(direction) => self.handle_track(direction),
            InputEvent::PlayPause => self.handle_play_pause(),
            InputEvent::Mute => self.handle_mute(),
            InputEvent::Shutdown => {
                info!("shutdown button pressed");
                // Terminal action; the orchestrator tears down from here.
                let _ = self.shutdown.send(());
            },
        }
    }

    fn handle_volume(&self, direction: Direction) {
        let changed = {
            let mut volume = self.volume.lock();
            match direction {
                Direction::Increment => volume.increase(self.volume_step),
                Direction::Decrement => volume.decrease(self.volume_step),
            }
        };
        match changed {
            Some(level) => self.send(BackendCommand::SetVolume(level)),
            None => debug!("volume already at the clamp, ignoring {:?}", direction),
        }
    }

    fn handle_track(&self, direction: Direction) {
        let Some(snap) = self.status.lock().clone() else {
            debug!("no playback status yet, ignoring track skip");
            return;
        };
        if snap.playlist_length <= 1 {
            debug!("single-entry queue, ignoring track skip");
            return;
        }
        match direction {
            Direction::Increment => self.send(BackendCommand::NextTrack),
            Direction::Decrement => {
                // The first song has no predecessor.
                if snap.song.unwrap_or(0) >= 1 {
                    self.send(BackendCommand::PreviousTrack);
                } else {
                    debug!("already at the first song, ignoring previous");
                }
            },
        }
    }

    fn handle_play_pause(&self) {
        let paused = self.paused.toggle();
        info!("{}", if paused { "pausing" } else { "resuming" });
        // Immediate feedback; the next status tick reconciles.
        self.led.show_pause(paused);
        self.send(BackendCommand::SetPause(paused));
    }

    fn handle_mute(&self) {
        let level = self.volume.lock().toggle_mute();
        info!("mute toggled, volume {}", level);
        self.send(BackendCommand::SetVolume(level));
    }

    fn send(&self, command: BackendCommand) {
        // Worker gone means we are shutting down.
        let _ = self.commands.send(command);
    }
}
