//! Backend connection lifecycle
//!
//! Owns the Connecting / Connected / Stalled / Disconnected state machine.
//! All transitions happen here, driven by the orchestrator's 1 Hz tick: a
//! tick performs either a reconnect attempt or a heartbeat, never both.
//! Reconnection retries forever at the tick cadence; the radio keeps trying
//! until the backend comes back.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{AudioBackend, BackendResult, PlayerState};
use crate::state::{PauseFlag, SharedStatus, SharedVolume};

/// Consecutive inactive heartbeats tolerated before the connection is
/// declared stalled.
pub const DEFAULT_STALL_THRESHOLD: u32 = 5;

/// Connection phase. Transitions are centralized in [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Connected,
    Stalled,
    Disconnected,
}

#[derive(Debug)]
struct ConnState {
    phase: ConnectionPhase,
    consecutive_stall_ticks: u32,
    reconnect_attempts: u32,
}

/// Lifecycle policy knobs.
#[derive(Debug, Clone)]
pub struct ConnectionPolicy {
    pub stall_threshold: u32,
    /// Stream re-enqueued after every successful connect.
    pub default_stream: Option<String>,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            default_stream: None,
        }
    }
}

pub struct ConnectionManager {
    backend: Arc<dyn AudioBackend>,
    volume: SharedVolume,
    status: SharedStatus,
    paused: Arc<PauseFlag>,
    policy: ConnectionPolicy,
    state: Mutex<ConnState>,
}

impl ConnectionManager {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        volume: SharedVolume,
        status: SharedStatus,
        paused: Arc<PauseFlag>,
        policy: ConnectionPolicy,
    ) -> Self {
        Self {
            backend,
            volume,
            status,
            paused,
            policy,
            state: Mutex::new(ConnState {
                phase: ConnectionPhase::Connecting,
                consecutive_stall_ticks: 0,
                reconnect_attempts: 0,
            }),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.state.lock().phase
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.state.lock().reconnect_attempts
    }

    /// Advance the state machine by one tick.
    pub async fn tick(&self) {
        let phase = self.phase();
        match phase {
            ConnectionPhase::Connecting => self.attempt_connect().await,
            ConnectionPhase::Connected => self.heartbeat().await,
            ConnectionPhase::Stalled => {
                // Reconnect-first recovery: drop the link instead of poking
                // at a backend that claims to play but produces nothing.
                warn!("backend stalled, forcing disconnect");
                self.backend.disconnect().await;
                self.reset_transient(ConnectionPhase::Connecting);
            },
            ConnectionPhase::Disconnected => {
                self.reset_transient(ConnectionPhase::Connecting);
            },
        }
    }

    async fn attempt_connect(&self) {
        match self.backend.connect().await {
            Ok(()) => match self.restore().await {
                Ok(()) => {
                    let attempts = {
                        let mut st = self.state.lock();
                        let attempts = st.reconnect_attempts;
                        st.phase = ConnectionPhase::Connected;
                        st.reconnect_attempts = 0;
                        st.consecutive_stall_ticks = 0;
                        attempts
                    };
                    info!("backend connected after {} failed attempt(s)", attempts);
                },
                Err(e) => {
                    warn!("connected but state restore failed: {}", e);
                    self.reset_transient(ConnectionPhase::Disconnected);
                },
            },
            Err(e) => {
                let mut st = self.state.lock();
                st.reconnect_attempts += 1;
                debug!("connect attempt {} failed: {}", st.reconnect_attempts, e);
            },
        }
    }

    /// Bring a fresh connection back to the state the user left: empty the
    /// queue, reapply the last persisted volume, re-enqueue the default
    /// stream, and resume playback.
    async fn restore(&self) -> BackendResult<()> {
        self.backend.clear_queue().await?;

        let level = self.volume.lock().restore_persisted();
        self.backend.set_volume(level).await?;

        if let Some(uri) = &self.policy.default_stream {
            let id = self.backend.enqueue(uri).await?;
            debug!("enqueued default stream as id {}", id);
            self.backend.play().await?;
        }
        self.paused.set(false);
        Ok(())
    }

    async fn heartbeat(&self) {
        match self.backend.status().await {
            Ok(snap) => {
                debug!(
                    "heartbeat: state={:?} song={:?} len={} audio_active={}",
                    snap.state, snap.song, snap.playlist_length, snap.audio_active
                );
                // Reconcile the pause flag with what the backend reports.
                match snap.state {
                    PlayerState::Paused => self.paused.set(true),
                    PlayerState::Playing => self.paused.set(false),
                    PlayerState::Stopped => {},
                }

                let mut st = self.state.lock();
                if snap.audio_active {
                    st.consecutive_stall_ticks = 0;
                } else {
                    st.consecutive_stall_ticks += 1;
                    if st.consecutive_stall_ticks >= self.policy.stall_threshold {
                        warn!(
                            "no audio for {} consecutive ticks, marking stalled",
                            st.consecutive_stall_ticks
                        );
                        st.phase = ConnectionPhase::Stalled;
                    }
                }
                drop(st);
                *self.status.lock() = Some(snap);
            },
            Err(e) if e.is_transient() => {
                warn!("heartbeat failed: {}", e);
                self.reset_transient(ConnectionPhase::Disconnected);
            },
            Err(e) => {
                // Command rejected but the link is alive; keep the phase.
                warn!("heartbeat protocol error: {}", e);
            },
        }
    }

    /// Drop per-connection state and move to `phase`.
    fn reset_transient(&self, phase: ConnectionPhase) {
        *self.status.lock() = None;
        let mut st = self.state.lock();
        st.consecutive_stall_ticks = 0;
        st.phase = phase;
    }
}
