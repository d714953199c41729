//! Configuration
//!
//! YAML configuration with per-field defaults: a missing or unreadable file
//! is not fatal, the radio always comes up with the built-in pin map and
//! timings (spoken BCM numbers, matching the wiring of the original
//! hardware).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub pins: PinConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Where the last-known volume is stored. Defaults to the per-user
    /// config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

/// MPD backend endpoint and behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_host")]
    pub host: String,
    #[serde(default = "default_backend_port")]
    pub port: u16,
    /// Bound on every backend call, reconnects included.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Stream re-enqueued after every successful connect.
    #[serde(default = "default_stream")]
    pub default_stream: Option<String>,
}

/// BCM pin assignments for the control surface.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PinConfig {
    #[serde(default = "default_led_red")]
    pub led_red: u8,
    #[serde(default = "default_led_green")]
    pub led_green: u8,
    #[serde(default = "default_led_blue")]
    pub led_blue: u8,
    #[serde(default = "default_volume_clk")]
    pub volume_clk: u8,
    #[serde(default = "default_volume_dt")]
    pub volume_dt: u8,
    #[serde(default = "default_volume_sw")]
    pub volume_sw: u8,
    #[serde(default = "default_track_clk")]
    pub track_clk: u8,
    #[serde(default = "default_track_dt")]
    pub track_dt: u8,
    #[serde(default = "default_track_sw")]
    pub track_sw: u8,
    #[serde(default = "default_shutdown_sw")]
    pub shutdown_sw: u8,
}

/// Periods, debounce windows, and step sizes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Heartbeat / LED / reconnect tick period. 1 s is the floor the
    /// unbounded reconnect policy was designed around; do not lower it.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_persist_interval_ms")]
    pub persist_interval_ms: u64,
    /// Encoder CLK re-trigger window; short enough to keep every detent.
    #[serde(default = "default_encoder_debounce_ms")]
    pub encoder_debounce_ms: u64,
    /// Push-switch re-trigger window; long enough to swallow contact bounce.
    #[serde(default = "default_switch_debounce_ms")]
    pub switch_debounce_ms: u64,
    /// Consecutive inactive heartbeats before a stall is declared.
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold: u32,
    /// Volume change per encoder detent.
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
}

fn default_backend_host() -> String {
    "localhost".to_string()
}
fn default_backend_port() -> u16 {
    6600
}
fn default_command_timeout_ms() -> u64 {
    5_000
}
fn default_stream() -> Option<String> {
    Some("http://radiodeejay-lh.akamaihd.net/i/RadioDeejay_Live_1@189857/master.m3u8".to_string())
}

fn default_led_red() -> u8 {
    6
}
fn default_led_green() -> u8 {
    13
}
fn default_led_blue() -> u8 {
    5
}
fn default_volume_clk() -> u8 {
    17
}
fn default_volume_dt() -> u8 {
    18
}
fn default_volume_sw() -> u8 {
    27
}
fn default_track_clk() -> u8 {
    21
}
fn default_track_dt() -> u8 {
    20
}
fn default_track_sw() -> u8 {
    16
}
fn default_shutdown_sw() -> u8 {
    12
}

fn default_tick_ms() -> u64 {
    1_000
}
fn default_persist_interval_ms() -> u64 {
    5_000
}
fn default_encoder_debounce_ms() -> u64 {
    1
}
fn default_switch_debounce_ms() -> u64 {
    300
}
fn default_stall_threshold() -> u32 {
    5
}
fn default_volume_step() -> u8 {
    5
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_backend_host(),
            port: default_backend_port(),
            command_timeout_ms: default_command_timeout_ms(),
            default_stream: default_stream(),
        }
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            led_red: default_led_red(),
            led_green: default_led_green(),
            led_blue: default_led_blue(),
            volume_clk: default_volume_clk(),
            volume_dt: default_volume_dt(),
            volume_sw: default_volume_sw(),
            track_clk: default_track_clk(),
            track_dt: default_track_dt(),
            track_sw: default_track_sw(),
            shutdown_sw: default_shutdown_sw(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            persist_interval_ms: default_persist_interval_ms(),
            encoder_debounce_ms: default_encoder_debounce_ms(),
            switch_debounce_ms: default_switch_debounce_ms(),
            stall_threshold: default_stall_threshold(),
            volume_step: default_volume_step(),
        }
    }
}

impl AppConfig {
    /// Load from a YAML file. A missing or corrupt file yields the defaults
    /// with a warning; configuration problems never keep the radio down.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("config file {} unreadable ({}), using defaults", path.display(), e);
                return Self::default();
            },
        };
        match serde_yaml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!("config file {} invalid ({}), using defaults", path.display(), e);
                Self::default()
            },
        }
    }

    /// Resolve the state-file path: explicit setting, else the per-user
    /// config directory, else the working directory.
    pub fn state_path(&self) -> PathBuf {
        if let Some(path) = &self.state_file {
            return path.clone();
        }
        dirs::config_dir()
            .map(|dir| dir.join("radioknob").join("state.yaml"))
            .unwrap_or_else(|| PathBuf::from("radioknob-state.yaml"))
    }
}
