//! Scriptable backend for tests

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AudioBackend, BackendError, BackendResult, PlaybackSnapshot, PlayerState};

/// Records every call in order and replays scripted results for `connect`
/// and `status`. Unscripted calls succeed.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    connect_results: Mutex<VecDeque<BackendResult<()>>>,
    status_results: Mutex<VecDeque<BackendResult<PlaybackSnapshot>>>,
    fail_commands: Mutex<bool>,
}

/// Snapshot builder with sane defaults for lifecycle tests.
pub fn snapshot(state: PlayerState, audio_active: bool) -> PlaybackSnapshot {
    PlaybackSnapshot {
        state,
        elapsed_secs: Some(1.0),
        song: Some(0),
        playlist_length: 1,
        volume: Some(50),
        bitrate_kbps: Some(128),
        audio_active,
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_connect(&self, result: BackendResult<()>) {
        self.connect_results.lock().push_back(result);
    }

    pub fn push_status(&self, result: BackendResult<PlaybackSnapshot>) {
        self.status_results.lock().push_back(result);
    }

    /// Make transport/volume commands fail with a transient error.
    pub fn set_fail_commands(&self, fail: bool) {
        *self.fail_commands.lock() = fail;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn command_result(&self) -> BackendResult<()> {
        if *self.fail_commands.lock() {
            Err(BackendError::Transient("scripted failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn connect(&self) -> BackendResult<()> {
        self.record("connect");
        self.connect_results.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn disconnect(&self) {
        self.record("disconnect");
    }

    async fn set_volume(&self, volume: u8) -> BackendResult<()> {
        self.record(format!("setvol {volume}"));
        self.command_result()
    }

    async fn set_pause(&self, paused: bool) -> BackendResult<()> {
        self.record(format!("pause {}", paused as u8));
        self.command_result()
    }

    async fn next(&self) -> BackendResult<()> {
        self.record("next");
        self.command_result()
    }

    async fn previous(&self) -> BackendResult<()> {
        self.record("previous");
        self.command_result()
    }

    async fn status(&self) -> BackendResult<PlaybackSnapshot> {
        self.record("status");
        self.status_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(snapshot(PlayerState::Playing, true)))
    }

    async fn ping(&self) -> BackendResult<()> {
        self.record("ping");
        self.command_result()
    }

    async fn clear_queue(&self) -> BackendResult<()> {
        self.record("clear");
        self.command_result()
    }

    async fn enqueue(&self, uri: &str) -> BackendResult<u32> {
        self.record(format!("addid {uri}"));
        Ok(1)
    }

    async fn play(&self) -> BackendResult<()> {
        self.record("play");
        self.command_result()
    }
}
