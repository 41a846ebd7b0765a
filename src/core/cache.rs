//! Persistent per-environment inventory cache.
//!
//! Each environment's last synchronized inventory is stored as one JSON file
//! named after the environment fingerprint. The cache is best-effort: reads
//! never fail (missing or corrupt entries are absent) and writes that hit an
//! I/O error are dropped after logging.
//!
//! # Cache Strategy
//! - **JSON serialization**: Human-readable cache files for debugging
//! - **Atomic writes**: Entries are written to a temp file and renamed into place
//! - **Last writer wins**: A write replaces the whole entry, nothing is merged

use crate::core::error::{PipPilotError, Result};
use crate::core::package::{Environment, PackageRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const ENTRY_EXTENSION: &str = "json";
const FINGERPRINT_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub synced_at: DateTime<Utc>,
    pub packages: Vec<PackageRecord>,
}

#[derive(Debug, Clone)]
pub struct InventoryCache {
    root: PathBuf,
}

impl InventoryCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.root.join(format!("{fingerprint}.{ENTRY_EXTENSION}"))
    }

    /// Last stored entry for `fingerprint`, or `None` when missing or unreadable.
    pub fn get(&self, fingerprint: &str) -> Option<CacheEntry> {
        match self.read_entry(fingerprint) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Ignoring cache entry for {fingerprint}: {e}");
                None
            }
        }
    }

    pub fn get_for(&self, env: &Environment) -> Option<CacheEntry> {
        self.get(&env.fingerprint())
    }

    /// Replace the entry for `fingerprint`. Failures are logged and swallowed.
    pub fn put(&self, fingerprint: &str, packages: &[PackageRecord]) {
        let entry = CacheEntry {
            fingerprint: fingerprint.to_string(),
            synced_at: Utc::now(),
            packages: packages.to_vec(),
        };

        match self.write_entry(&entry) {
            Ok(()) => log::debug!(
                "Cached {} packages for {fingerprint}",
                entry.packages.len()
            ),
            Err(e) => log::warn!("Failed to write cache entry for {fingerprint}: {e}"),
        }
    }

    pub fn put_for(&self, env: &Environment, packages: &[PackageRecord]) {
        self.put(&env.fingerprint(), packages)
    }

    /// Remove every cached entry. Returns how many entries were removed.
    ///
    /// Only files named `<fingerprint>.json` are touched, so a cache root that
    /// points at a shared directory loses nothing else.
    pub fn clear(&self) -> usize {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Nothing to clear in {}: {e}", self.root.display());
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_entry_file(&path) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to remove cache entry '{}': {e}", path.display()),
            }
        }

        log::debug!("Cleared {removed} cache entries from {}", self.root.display());
        removed
    }

    fn read_entry(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(fingerprint);
        if !path.exists() {
            log::debug!("No cache entry at {}", path.display());
            return Ok(None);
        }

        let content =
            fs::read_to_string(&path).map_err(|e| PipPilotError::cache_corrupt(&path, e))?;
        let entry: CacheEntry =
            serde_json::from_str(&content).map_err(|e| PipPilotError::cache_corrupt(&path, e))?;

        if entry.fingerprint != fingerprint {
            log::warn!(
                "Cache entry '{}' belongs to {}, ignoring",
                path.display(),
                entry.fingerprint
            );
            return Ok(None);
        }

        Ok(Some(entry))
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(entry)?;

        let mut staged = tempfile::NamedTempFile::new_in(&self.root)?;
        staged.write_all(json.as_bytes())?;
        staged.flush()?;
        staged
            .persist(self.entry_path(&entry.fingerprint))
            .map_err(|e| PipPilotError::Io(e.error))?;
        Ok(())
    }
}

/// `<32 hex digits>.json`, the shape of files written for an [`Environment`].
fn is_entry_file(path: &Path) -> bool {
    let is_json = path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION);
    let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default();
    is_json && stem.len() == FINGERPRINT_LEN && stem.chars().all(|c| c.is_ascii_hexdigit())
}
