//! Package inventory synchronization.
//!
//! [`Synchronizer`] lists the installed packages of an environment, annotates
//! each with the latest registry version and stores the result in the
//! [`InventoryCache`].
//!
//! # Failure Policy
//! - A failed listing fails the whole synchronization with `InventoryUnavailable`
//!   and leaves the cache untouched
//! - A failed registry lookup only degrades that package: its latest version
//!   falls back to the installed one and it is reported as up to date
//!
//! # Concurrency
//! Registry lookups run on a bounded `rayon` pool. [`spawn_synchronize`] moves
//! the whole operation to a worker thread and reports progress over a channel.

use crate::core::cache::{CacheEntry, InventoryCache};
use crate::core::error::{PipPilotError, Result};
use crate::core::package::{InstalledPackage, PackageRecord};
use crate::core::pip::PackageManager;
use crate::core::registry::Registry;
use crate::core::skip_policy::SkipPolicy;
use crossbeam_channel::{Receiver, Sender};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub list_timeout: Duration,
    /// Upper bound on concurrent registry lookups
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            list_timeout: Duration::from_secs(30),
            concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub done: usize,
    pub total: usize,
}

impl SyncProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.done.min(self.total) * 100) / self.total) as u8
    }
}

pub struct Synchronizer<R> {
    registry: R,
    cache: InventoryCache,
    skip_policy: SkipPolicy,
    options: SyncOptions,
}

impl<R: Registry> Synchronizer<R> {
    pub fn new(registry: R, cache: InventoryCache) -> Self {
        Self {
            registry,
            cache,
            skip_policy: SkipPolicy::default(),
            options: SyncOptions::default(),
        }
    }

    pub fn with_skip_policy(mut self, skip_policy: SkipPolicy) -> Self {
        self.skip_policy = skip_policy;
        self
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Last synchronized inventory for the manager's environment, if any.
    pub fn cached<M: PackageManager + ?Sized>(&self, manager: &M) -> Option<CacheEntry> {
        self.cache.get_for(manager.environment())
    }

    pub fn synchronize<M: PackageManager + ?Sized>(&self, manager: &M) -> Result<Vec<PackageRecord>> {
        self.synchronize_with_progress(manager, |_| {})
    }

    /// Synchronize, reporting progress after the listing and after every package.
    pub fn synchronize_with_progress<M, F>(
        &self,
        manager: &M,
        on_progress: F,
    ) -> Result<Vec<PackageRecord>>
    where
        M: PackageManager + ?Sized,
        F: Fn(SyncProgress) + Sync,
    {
        let env = manager.environment();
        log::debug!("Synchronizing inventory for {env}");
        if let Some(previous) = self.cache.get_for(env) {
            log::debug!(
                "Replacing inventory from {} ({} packages)",
                previous.synced_at,
                previous.packages.len()
            );
        }

        let installed = manager
            .list_installed(self.options.list_timeout)
            .map_err(PipPilotError::inventory_unavailable)?;
        let installed = dedupe(installed);

        let total = installed.len();
        on_progress(SyncProgress { done: 0, total });

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.concurrency.max(1))
            .thread_name(|i| format!("pip-pilot-lookup-{i}"))
            .build()?;
        let finished = AtomicUsize::new(0);

        let records: Vec<PackageRecord> = pool.install(|| {
            installed
                .into_par_iter()
                .map(|package| {
                    let record = self.annotate(package);
                    let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    on_progress(SyncProgress { done, total });
                    record
                })
                .collect()
        });

        let outdated = records.iter().filter(|record| !record.up_to_date).count();
        log::debug!(
            "Synchronized {} packages for {env} ({outdated} outdated)",
            records.len()
        );

        self.cache.put_for(env, &records);
        Ok(records)
    }

    /// Compare the package manager's own version against the registry.
    /// `None` when the installed version cannot be read.
    pub fn check_tool<M: PackageManager + ?Sized>(&self, manager: &M) -> Option<PackageRecord> {
        let name = manager.tool_name();
        let installed = match manager.tool_version(self.options.list_timeout) {
            Ok(version) => version,
            Err(e) => {
                log::debug!("Could not read {name} version: {e}");
                return None;
            }
        };
        Some(self.lookup(InstalledPackage::new(name, installed)))
    }

    fn annotate(&self, package: InstalledPackage) -> PackageRecord {
        if self.skip_policy.should_skip(&package.name) {
            log::debug!("Skipping registry lookup for {}", package.name);
            return PackageRecord::degraded(package.name, package.version);
        }
        self.lookup(package)
    }

    fn lookup(&self, package: InstalledPackage) -> PackageRecord {
        match self.registry.latest_version(&package.name) {
            Ok(latest) => PackageRecord::resolved(package.name, package.version, latest),
            Err(e) => {
                log::debug!("Registry lookup for {} degraded: {e}", package.name);
                PackageRecord::degraded(package.name, package.version)
            }
        }
    }
}

/// Keep the first entry for every case-insensitive name.
fn dedupe(installed: Vec<InstalledPackage>) -> Vec<InstalledPackage> {
    let mut seen = HashSet::new();
    installed
        .into_iter()
        .filter(|package| {
            let fresh = seen.insert(package.name.to_lowercase());
            if !fresh {
                log::warn!("Duplicate package entry '{}' ignored", package.name);
            }
            fresh
        })
        .collect()
}

#[derive(Debug)]
pub enum SyncEvent {
    Progress(SyncProgress),
    Finished(Result<Vec<PackageRecord>>),
}

/// A synchronization running on a worker thread.
pub struct SyncHandle {
    events: Receiver<SyncEvent>,
}

impl SyncHandle {
    pub fn events(&self) -> &Receiver<SyncEvent> {
        &self.events
    }

    pub fn wait(self) -> Result<Vec<PackageRecord>> {
        self.wait_with(|_| {})
    }

    /// Block until the synchronization finishes, forwarding progress events.
    pub fn wait_with(self, mut on_progress: impl FnMut(SyncProgress)) -> Result<Vec<PackageRecord>> {
        for event in self.events.iter() {
            match event {
                SyncEvent::Progress(progress) => on_progress(progress),
                SyncEvent::Finished(result) => return result,
            }
        }
        Err(PipPilotError::inventory_unavailable(PipPilotError::Io(
            std::io::Error::other("synchronization worker stopped unexpectedly"),
        )))
    }
}

/// Run [`Synchronizer::synchronize_with_progress`] on a worker thread.
pub fn spawn_synchronize<R, M>(sync: Arc<Synchronizer<R>>, manager: Arc<M>) -> Result<SyncHandle>
where
    R: Registry + 'static,
    M: PackageManager + ?Sized + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("pip-pilot-sync".to_string())
        .spawn(move || {
            let progress_tx = tx.clone();
            let result = sync.synchronize_with_progress(manager.as_ref(), move |progress| {
                send_event(&progress_tx, SyncEvent::Progress(progress));
            });
            send_event(&tx, SyncEvent::Finished(result));
        })?;
    Ok(SyncHandle { events: rx })
}

fn send_event(tx: &Sender<SyncEvent>, event: SyncEvent) {
    if tx.send(event).is_err() {
        log::debug!("Synchronization event dropped, receiver is gone");
    }
}
