//! User settings for registry access, timeouts and the lookup skip policy.
//!
//! Settings live in `config.json` inside the pip-pilot config directory. A
//! missing file yields the defaults; every field is optional in the file.

use crate::core::dirs::get_config_directory;
use crate::core::error::{PipPilotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REGISTRY_URL: &str = "https://pypi.org/pypi";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub registry_url: String,
    pub list_timeout_secs: u64,
    pub lookup_timeout_secs: u64,
    pub mutation_timeout_secs: u64,
    pub update_all_timeout_secs: u64,
    pub lookup_concurrency: usize,
    /// Names containing any of these characters are not looked up in the registry.
    pub skip_name_chars: Vec<char>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            list_timeout_secs: 30,
            lookup_timeout_secs: 5,
            mutation_timeout_secs: 60,
            update_all_timeout_secs: 30 * 60,
            lookup_concurrency: 8,
            skip_name_chars: vec!['-', '.'],
        }
    }
}

impl Settings {
    pub fn config_file() -> Result<PathBuf> {
        Ok(get_config_directory()?.join("config.json"))
    }

    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content).map_err(|e| {
            PipPilotError::config_error(format!("invalid config file '{}': {e}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.lookup_concurrency == 0 {
            return Err(PipPilotError::config_error(
                "lookup_concurrency must be at least 1",
            ));
        }
        if self.registry_url.trim().is_empty() {
            return Err(PipPilotError::config_error("registry_url must not be empty"));
        }
        Ok(())
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn mutation_timeout(&self) -> Duration {
        Duration::from_secs(self.mutation_timeout_secs)
    }

    pub fn update_all_timeout(&self) -> Duration {
        Duration::from_secs(self.update_all_timeout_secs)
    }
}
