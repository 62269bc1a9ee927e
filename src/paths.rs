//! Config file location
//!
//! Resolution order:
//! 1. `--config` / `MONSYNC_CONFIG` (handled by clap, passed in here)
//! 2. `XDG_CONFIG_HOME/monsync/config.toml` (if set)
//! 3. `~/.config/monsync/config.toml`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for the config file path
pub const ENV_CONFIG: &str = "MONSYNC_CONFIG";

const CONFIG_FILE: &str = "config.toml";

/// Resolve the config file path, preferring an explicit one
pub fn config_path(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = expand_path(path);
        log::debug!("Using config file {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return Ok(PathBuf::from(xdg_config).join("monsync").join(CONFIG_FILE));
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("monsync").join(CONFIG_FILE))
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).map_or_else(
        |_| shellexpand::tilde(path).into_owned(),
        std::borrow::Cow::into_owned,
    );
    PathBuf::from(expanded)
}
