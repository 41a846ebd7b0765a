use crate::core::error::{PipPilotError, Result};
use std::path::PathBuf;

const APP_DIR: &str = "pip-pilot";

/// Explicit overrides, mostly useful for tests and portable installs.
pub const CONFIG_DIR_ENV: &str = "PIP_PILOT_CONFIG_DIR";
pub const CACHE_DIR_ENV: &str = "PIP_PILOT_CACHE_DIR";

pub fn get_config_directory() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config"))),
        "macos" => dirs::home_dir().map(|home| home.join("Library/Application Support")),
        _ => dirs::config_dir(),
    };

    base.map(|base| base.join(APP_DIR))
        .ok_or_else(|| PipPilotError::config_error("could not determine a config directory"))
}

/// Root under which every environment's inventory is cached, one file per
/// environment fingerprint.
pub fn get_cache_directory() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|home| home.join(".cache"))),
        "macos" => dirs::home_dir().map(|home| home.join("Library/Caches")),
        _ => dirs::cache_dir(),
    };

    base.map(|base| base.join(APP_DIR).join("inventories"))
        .ok_or(PipPilotError::CacheDirectoryNotFound)
}
