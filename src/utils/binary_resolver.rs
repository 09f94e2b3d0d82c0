use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

/// Locate an executable.
///
/// Lookup order: the `SIM_PILOT_<NAME>` environment variable, the explicit
/// configured path, `~/.sim-pilot/bin`, the usual Homebrew/pip install
/// locations, then `PATH`.
pub fn find_binary(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    let mut checked_paths = Vec::new();

    let env_key = format!("SIM_PILOT_{}", name.to_uppercase().replace('-', "_"));
    if let Ok(value) = std::env::var(&env_key) {
        let path = PathBuf::from(value);
        checked_paths.push(format!("${}: {:?}", env_key, path));
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(path) = configured {
        checked_paths.push(format!("Config: {:?}", path));
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    for candidate in install_locations(name) {
        checked_paths.push(format!("Install Dir: {:?}", candidate));
        if candidate.exists() {
            debug!("Resolved {} to {}", name, candidate.display());
            return Ok(candidate);
        }
    }

    if let Ok(path) = which::which(name) {
        return Ok(path);
    }
    checked_paths.push("PATH".to_string());

    Err(anyhow::anyhow!(
        "Could not find '{}'. Checked paths:\n{}",
        name,
        checked_paths.join("\n")
    ))
}

fn install_locations(name: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".sim-pilot").join("bin").join(name));
        // `pip install --user fb-idb`
        candidates.push(home.join(".local").join("bin").join(name));
    }
    candidates.push(PathBuf::from("/opt/homebrew/bin").join(name));
    candidates.push(PathBuf::from("/usr/local/bin").join(name));
    candidates
}

/// Find the idb client
pub fn find_idb(configured: Option<&Path>) -> Result<PathBuf> {
    find_binary("idb", configured)
}
