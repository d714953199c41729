//! Audio backend integration
//!
//! The control loop talks to MPD through the [`AudioBackend`] trait: the
//! connection lifecycle manager drives it from the tick loop, while router
//! commands are handed to a dedicated worker task so the interrupt path
//! never waits on a network round-trip.

pub mod connection;
#[cfg(test)]
pub mod fake;
pub mod mpd;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Backend failure taxonomy. Transient failures feed the connection
/// lifecycle state machine; protocol failures are logged and skipped.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transient(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
    #[error("backend protocol error: {0}")]
    Protocol(String),
    #[error("not connected to backend")]
    NotConnected,
}

impl BackendError {
    /// True when the failure indicates a lost or unusable connection rather
    /// than a rejected command.
    pub fn is_transient(&self) -> bool {
        !matches!(self, BackendError::Protocol(_))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError::Transient(e.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Player transport state as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Paused,
    Stopped,
}

/// Immutable result of one status query. Produced fresh each heartbeat and
/// superseded by the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlayerState,
    /// Seconds into the current song, if the backend reports it.
    pub elapsed_secs: Option<f64>,
    /// Index of the current song in the queue.
    pub song: Option<u32>,
    pub playlist_length: u32,
    pub volume: Option<u8>,
    pub bitrate_kbps: Option<u32>,
    /// False when the backend is connected but not producing audio. This is
    /// the stall signal the lifecycle manager watches.
    pub audio_active: bool,
}

/// Backend client collaborator.
///
/// All methods take `&self`; implementations use interior mutability so the
/// client can be shared as `Arc<dyn AudioBackend>` between the tick loop and
/// the command worker. Every call must complete within a bounded time.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn connect(&self) -> BackendResult<()>;
    async fn disconnect(&self);
    async fn set_volume(&self, volume: u8) -> BackendResult<()>;
    async fn set_pause(&self, paused: bool) -> BackendResult<()>;
    async fn next(&self) -> BackendResult<()>;
    async fn previous(&self) -> BackendResult<()>;
    async fn status(&self) -> BackendResult<PlaybackSnapshot>;
    async fn ping(&self) -> BackendResult<()>;
    /// Drop the whole play queue.
    async fn clear_queue(&self) -> BackendResult<()>;
    /// Append a stream URI to the queue, returning its queue id.
    async fn enqueue(&self, uri: &str) -> BackendResult<u32>;
    /// Start playback at the head of the queue.
    async fn play(&self) -> BackendResult<()>;
}

/// Fire-and-forget command issued by the input router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCommand {
    SetVolume(u8),
    SetPause(bool),
    NextTrack,
    PreviousTrack,
}

/// Spawn the worker that executes router commands against the backend.
///
/// Failures are logged and dropped: commands issued while the backend is
/// down fail fast, and recovery belongs to the connection lifecycle manager.
pub fn spawn_command_worker(
    backend: Arc<dyn AudioBackend>,
    mut commands: mpsc::UnboundedReceiver<BackendCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(cmd) = commands.recv().await {
            let result = match cmd {
                BackendCommand::SetVolume(v) => backend.set_volume(v).await,
                BackendCommand::SetPause(p) => backend.set_pause(p).await,
                BackendCommand::NextTrack => backend.next().await,
                BackendCommand::PreviousTrack => backend.previous().await,
            };
            match result {
                Ok(()) => debug!("backend command {:?} ok", cmd),
                Err(e) => warn!("backend command {:?} failed: {}", cmd, e),
            }
        }
        debug!("command worker shutting down");
    })
}
