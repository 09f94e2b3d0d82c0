pub mod adapter;
pub mod ios;
#[cfg(test)]
pub mod testing;
pub mod traits;

pub use adapter::BackendAdapter;
pub use traits::{LogQuery, SessionOptions, SimulatorBackend, SimulatorInfo};

use anyhow::Result;
use colored::Colorize;

/// Print the simulators the backend knows about
pub async fn list_devices(backend: &dyn SimulatorBackend) -> Result<()> {
    let simulators = backend.list_simulators().await?;

    if simulators.is_empty() {
        println!("No iOS simulators found.");
        println!("Make sure idb_companion is running.");
        return Ok(());
    }

    println!("Available simulators:");
    for sim in simulators {
        let state = if sim.is_booted() {
            sim.state.green()
        } else {
            sim.state.dimmed()
        };
        println!(
            "  {} - {} {} ({})",
            sim.udid,
            sim.name,
            sim.os_version.as_deref().unwrap_or(""),
            state
        );
    }

    Ok(())
}
