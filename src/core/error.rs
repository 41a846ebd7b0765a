//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`PipPilotError`] which covers every failure the core can
//! surface. It uses `thiserror` for ergonomic error definitions and includes
//! constructors for the failure modes that carry context.
//!
//! # Public API
//! - [`PipPilotError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, PipPilotError>`
//!
//! # Error Categories
//! - **Inventory**: the installed-package listing failed (fatal for a synchronization)
//! - **Registry**: per-package lookups; absorbed by the synchronizer, never surfaced
//! - **Mutations**: single-flight rejection and terminal job failures
//! - **Processes**: non-zero exits, timeouts and malformed tool output
//! - **Infrastructure**: I/O, JSON, configuration and cache directory errors

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for pip-pilot
#[derive(Error, Debug)]
pub enum PipPilotError {
    // Inventory errors
    #[error("Installed packages could not be listed: {source}")]
    InventoryUnavailable { source: Box<PipPilotError> },

    // Registry errors
    #[error("Registry lookup for '{name}' timed out")]
    RegistryTimeout { name: String },

    #[error("Package '{name}' was not found in the registry")]
    RegistryNotFound { name: String },

    #[error("Registry response for '{name}' has no version field")]
    RegistryMalformed { name: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Mutation errors
    #[error("Another operation is still running ({target}), please wait")]
    Busy { target: String },

    #[error("Operation failed: {reason}")]
    MutationFailed { reason: String },

    #[error("No package name provided. Usage: pip-pilot <command> <package>")]
    NoPackageName,

    // Process errors
    #[error("{program} exited with {}: {output}", describe_exit(.exit_code))]
    ProcessFailed {
        program: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("{program} did not finish within {timeout_secs}s")]
    ProcessTimeout { program: String, timeout_secs: u64 },

    #[error("Unexpected package listing output: {0}")]
    MalformedListing(serde_json::Error),

    // Cache errors
    #[error("Could not find cache directory")]
    CacheDirectoryNotFound,

    #[error("Cache entry '{path}' is unreadable: {source}")]
    CacheCorrupt {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Could not start lookup workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

/// Convenience type alias for Results using PipPilotError
pub type Result<T> = std::result::Result<T, PipPilotError>;

impl PipPilotError {
    /// Wrap a listing failure as an inventory unavailability error
    pub fn inventory_unavailable(source: PipPilotError) -> Self {
        Self::InventoryUnavailable {
            source: Box::new(source),
        }
    }

    /// Create a busy error naming the package currently being mutated
    pub fn busy(target: impl Into<String>) -> Self {
        Self::Busy {
            target: target.into(),
        }
    }

    /// Create a terminal mutation failure
    pub fn mutation_failed(reason: impl Into<String>) -> Self {
        Self::MutationFailed {
            reason: reason.into(),
        }
    }

    /// Create a process failure from an exit code and captured output
    pub fn process_failed(
        program: impl Into<String>,
        exit_code: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        Self::ProcessFailed {
            program: program.into(),
            exit_code,
            output: output.into(),
        }
    }

    /// Create a process timeout error
    pub fn process_timeout(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self::ProcessTimeout {
            program: program.into(),
            timeout_secs,
        }
    }

    /// Create a corrupt cache entry error
    pub fn cache_corrupt<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::CacheCorrupt {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
