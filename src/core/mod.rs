//! Core functionality for the pip-pilot tool.
//!
//! This module provides the inventory synchronizer, the mutation orchestrator,
//! the inventory cache they share, and the collaborators they drive.

pub mod cache;
pub mod colors;
pub mod command_init;
pub mod config;
pub mod dirs;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod package;
pub mod pip;
pub mod process;
pub mod registry;
pub mod skip_policy;
pub mod sync;

// === Error handling ===
// Core error types and result type used throughout the application
pub use error::{PipPilotError, Result};

// === Shared types ===
// Environment identity, installed and annotated package records
pub use package::{
    filter_by_name, find_package, sort_by_name, sort_outdated_first, Environment,
    InstalledPackage, MutationKind, PackageRecord,
};

// === Inventory cache ===
// Per-environment persisted inventories keyed by fingerprint
pub use cache::{CacheEntry, InventoryCache};

// === Collaborators ===
// Package manager and registry capabilities the core consumes
pub use pip::{PackageManager, PipEnvironment};
pub use registry::{PypiRegistry, Registry};
pub use skip_policy::SkipPolicy;

// === Synchronization ===
pub use sync::{
    spawn_synchronize, SyncEvent, SyncHandle, SyncOptions, SyncProgress, Synchronizer,
};

// === Mutations ===
pub use orchestrator::{
    Canceller, JobEvent, JobHandle, JobOutcome, JobState, MutationJob, MutationOrchestrator,
};

// === Configuration ===
pub use config::Settings;

// === Command initialization ===
// Centralized setup shared by all subcommands
pub use command_init::{CommandContext, GlobalOptions};

// === Output formatting ===
pub use output::{
    print_error, print_info, print_log_line, print_outcome, print_section_header, print_success,
};
