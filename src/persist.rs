//! Volume persistence
//!
//! The last set volume survives restarts through a small YAML state file,
//! written at most once per interval and only when the value changed. The
//! format keeps the historical shape: a `last_config` mapping whose `volume`
//! entry is the level as a string.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::state::{SharedVolume, DEFAULT_VOLUME};

#[derive(Debug, Default, Deserialize, Serialize)]
struct PersistedConfig {
    #[serde(default)]
    last_config: LastConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct LastConfig {
    #[serde(default)]
    volume: String,
}

/// Durable storage for the last-known volume.
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the persisted volume. Missing, unreadable, or malformed files
    /// fall back to [`DEFAULT_VOLUME`] with a warning.
    pub async fn load_volume(&self) -> u8 {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "state file {} unreadable ({}), starting at volume {}",
                    self.path.display(),
                    e,
                    DEFAULT_VOLUME
                );
                return DEFAULT_VOLUME;
            },
        };
        let parsed: PersistedConfig = match serde_yaml::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    "state file {} invalid ({}), starting at volume {}",
                    self.path.display(),
                    e,
                    DEFAULT_VOLUME
                );
                return DEFAULT_VOLUME;
            },
        };
        match parsed.last_config.volume.trim().parse::<u8>() {
            Ok(volume) => volume.min(crate::state::VOLUME_MAX),
            Err(_) => {
                warn!(
                    "state file {} holds a non-numeric volume {:?}, starting at {}",
                    self.path.display(),
                    parsed.last_config.volume,
                    DEFAULT_VOLUME
                );
                DEFAULT_VOLUME
            },
        }
    }

    /// Write `volume` to the state file, creating parent directories on the
    /// first save.
    pub async fn save_volume(&self, volume: u8) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let doc = PersistedConfig {
            last_config: LastConfig {
                volume: volume.to_string(),
            },
        };
        let raw = serde_yaml::to_string(&doc)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(&self.path, raw).await
    }
}

/// One scheduler pass: write the current volume if it differs from the last
/// persisted one. Returns whether a write happened. A failed write leaves the
/// state dirty so the next pass retries.
pub async fn persist_once(volume: &SharedVolume, file: &StateFile) -> bool {
    let pending = {
        let vol = volume.lock();
        vol.is_dirty().then(|| vol.current())
    };
    let Some(level) = pending else {
        return false;
    };
    match file.save_volume(level).await {
        Ok(()) => {
            volume.lock().mark_persisted(level);
            debug!("persisted volume {}", level);
            true
        },
        Err(e) => {
            warn!("could not persist volume {}: {}", level, e);
            false
        },
    }
}

/// Spawn the write-on-change persistence loop.
pub fn spawn_persistence(
    volume: SharedVolume,
    file: StateFile,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            persist_once(&volume, &file).await;
        }
    })
}
