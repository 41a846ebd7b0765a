//! pip-pilot - inspect, update and clean up the packages of a Python environment.
//!
//! The library holds the parts of the tool with real state and failure
//! handling: the inventory synchronizer, which annotates installed packages
//! with their latest registry versions; the mutation orchestrator, which runs
//! one install/update/uninstall at a time while streaming its output; and the
//! per-environment inventory cache they share.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module:
//! - [`Synchronizer`] and [`spawn_synchronize`] for inventories
//! - [`MutationOrchestrator`] and [`JobHandle`] for mutations
//! - [`InventoryCache`] for persisted inventories
//! - [`PackageManager`] and [`Registry`] collaborator traits with pip/PyPI implementations

pub mod commands;
pub mod core;

// Re-export the core public API for external users
pub use core::{
    filter_by_name,
    find_package,
    spawn_synchronize,
    CacheEntry,
    Canceller,
    Environment,
    InstalledPackage,
    InventoryCache,
    JobEvent,
    JobHandle,
    JobOutcome,
    JobState,
    MutationJob,
    MutationKind,
    MutationOrchestrator,
    PackageManager,
    PackageRecord,
    PipEnvironment,
    PipPilotError,
    PypiRegistry,
    Registry,
    Result,
    Settings,
    SkipPolicy,
    SyncEvent,
    SyncHandle,
    SyncOptions,
    SyncProgress,
    Synchronizer,
};
