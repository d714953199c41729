//! Host power control
//!
//! The dedicated shutdown button halts the whole machine, not just the
//! process. The service user needs a sudoers entry for this exact command.

use anyhow::{Context, Result};
use tracing::info;

/// Request an immediate host halt through the system `shutdown` binary.
pub fn halt_host() -> Result<()> {
    info!("halting the host");
    let status = std::process::Command::new("sudo")
        .args(["shutdown", "-h", "now"])
        .status()
        .context("could not spawn shutdown")?;
    if !status.success() {
        anyhow::bail!("shutdown exited with {status}");
    }
    Ok(())
}
