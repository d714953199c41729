//! radioknob - headless internet radio control surface
//!
//! Bridges two rotary encoders, their push-switches, a shutdown button, and
//! a tri-color LED to an MPD instance on a Raspberry Pi.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod backend;
mod config;
mod gpio;
mod input;
mod led;
mod persist;
mod power;
mod router;
mod state;

use crate::backend::connection::{ConnectionManager, ConnectionPolicy};
use crate::backend::mpd::MpdBackend;
use crate::backend::{spawn_command_worker, AudioBackend};
use crate::config::AppConfig;
use crate::gpio::Gpio;
use crate::led::{LedDriver, LedPlan};
use crate::persist::{persist_once, spawn_persistence, StateFile};
use crate::router::InputRouter;
use crate::state::{PauseFlag, SharedStatus, VolumeState};

/// Rotary-encoder front panel for an MPD internet radio
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Query the backend once, print its status, and exit
    #[arg(long)]
    print_status: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting radioknob...");
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load(&args.config).await;

    let backend: Arc<dyn AudioBackend> = Arc::new(MpdBackend::new(
        config.backend.host.clone(),
        config.backend.port,
        Duration::from_millis(config.backend.command_timeout_ms),
    ));

    if args.print_status {
        return print_status(backend.as_ref()).await;
    }

    let shutdown = shutdown_signal();
    run_app(config, backend, shutdown).await?;

    info!("radioknob shutdown complete");
    Ok(())
}

async fn run_app(
    config: AppConfig,
    backend: Arc<dyn AudioBackend>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let gpio = open_gpio()?;
    let led = Arc::new(LedDriver::new(gpio.clone(), &config.pins));
    // Known-dark baseline before any status is available.
    led.clear();

    let state_file = StateFile::new(config.state_path());
    let initial_volume = state_file.load_volume().await;
    info!("starting at volume {}", initial_volume);

    let volume = VolumeState::shared(initial_volume);
    let status: SharedStatus = Arc::new(parking_lot::Mutex::new(None));
    let paused = PauseFlag::new();

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (halt_tx, mut halt_rx) = mpsc::unbounded_channel();

    let command_worker = spawn_command_worker(backend.clone(), command_rx);

    let manager = ConnectionManager::new(
        backend.clone(),
        volume.clone(),
        status.clone(),
        paused.clone(),
        ConnectionPolicy {
            stall_threshold: config.timing.stall_threshold,
            default_stream: config.backend.default_stream.clone(),
        },
    );

    let router = InputRouter::new(
        volume.clone(),
        status.clone(),
        paused,
        command_tx,
        led.clone(),
        halt_tx,
        config.timing.volume_step,
    );

    input::attach(&gpio, &config.pins, &config.timing, event_tx)?;
    info!("input lines attached");

    let persistence = spawn_persistence(
        volume.clone(),
        StateFile::new(config.state_path()),
        Duration::from_millis(config.timing.persist_interval_ms),
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(config.timing.tick_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut toggle = false;
    tokio::pin!(shutdown);

    let mut halt_requested = false;
    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                router.handle(event);
            }
            _ = ticker.tick() => {
                toggle = !toggle;
                manager.tick().await;
                let snapshot = status.lock().clone();
                led.render(LedPlan::for_status(manager.phase(), snapshot.as_ref()), toggle);
            }
            Some(()) = halt_rx.recv() => {
                halt_requested = true;
                break;
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    // Teardown order: stop writing, flush the volume, darken the panel,
    // close the link.
    persistence.abort();
    if persist_once(&volume, &state_file).await {
        info!("final volume flushed");
    }
    led.clear();
    backend.disconnect().await;
    command_worker.abort();

    if halt_requested {
        power::halt_host()?;
    }
    Ok(())
}

fn open_gpio() -> Result<Arc<dyn Gpio>> {
    #[cfg(feature = "rpi")]
    {
        Ok(Arc::new(gpio::rpi::RpiGpio::new()?))
    }
    #[cfg(not(feature = "rpi"))]
    {
        tracing::warn!("built without the rpi feature, using the inert GPIO backend");
        Ok(Arc::new(gpio::NullGpio))
    }
}

async fn print_status(backend: &dyn AudioBackend) -> Result<()> {
    backend.connect().await?;
    let snapshot = backend.status().await?;
    backend.disconnect().await;
    println!("state:    {:?}", snapshot.state);
    println!("queue:    {} entries", snapshot.playlist_length);
    if let Some(song) = snapshot.song {
        println!("song:     #{song}");
    }
    if let Some(elapsed) = snapshot.elapsed_secs {
        println!("elapsed:  {elapsed:.1}s");
    }
    if let Some(volume) = snapshot.volume {
        println!("volume:   {volume}");
    }
    if let Some(bitrate) = snapshot.bitrate_kbps {
        println!("bitrate:  {bitrate} kbps");
    }
    println!("audio:    {}", if snapshot.audio_active { "active" } else { "inactive" });
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
