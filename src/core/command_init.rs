//! Centralized initialization shared by every command.
//!
//! [`CommandContext`] resolves settings, the target environment and the cache
//! root once, then hands out the synchronizer and orchestrator configured from
//! them.
//!
//! # Initialization Steps
//! 1. **Settings**: Load `config.json`, falling back to defaults
//! 2. **Overrides**: Apply command-line registry overrides
//! 3. **Environment**: Target the requested interpreter
//! 4. **Cache**: Resolve the process-wide cache root

use crate::core::{
    cache::InventoryCache,
    config::Settings,
    dirs::get_cache_directory,
    error::Result,
    orchestrator::MutationOrchestrator,
    pip::PipEnvironment,
    registry::PypiRegistry,
    skip_policy::SkipPolicy,
    sync::{SyncOptions, Synchronizer},
};
use std::path::PathBuf;
use std::sync::Arc;

/// Options shared by all subcommands
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub python: PathBuf,
    pub registry: Option<String>,
}

pub struct CommandContext {
    pub settings: Settings,
    pub manager: Arc<PipEnvironment>,
    pub cache: InventoryCache,
}

impl CommandContext {
    pub fn initialize(options: &GlobalOptions) -> Result<Self> {
        let mut settings = Settings::load_or_default()?;
        if let Some(registry) = &options.registry {
            settings.registry_url = registry.clone();
        }

        let cache_root = get_cache_directory()?;
        log::debug!("Using cache directory: {}", cache_root.display());
        log::debug!("Targeting interpreter: {}", options.python.display());

        Ok(Self::new(
            settings,
            PipEnvironment::new(&options.python),
            InventoryCache::new(cache_root),
        ))
    }

    pub fn new(settings: Settings, manager: PipEnvironment, cache: InventoryCache) -> Self {
        Self {
            settings,
            manager: Arc::new(manager),
            cache,
        }
    }

    pub fn registry(&self) -> Result<PypiRegistry> {
        PypiRegistry::new(&self.settings.registry_url, self.settings.lookup_timeout())
    }

    pub fn synchronizer(&self) -> Result<Synchronizer<PypiRegistry>> {
        Ok(Synchronizer::new(self.registry()?, self.cache.clone())
            .with_skip_policy(SkipPolicy::containing(&self.settings.skip_name_chars))
            .with_options(SyncOptions {
                list_timeout: self.settings.list_timeout(),
                concurrency: self.settings.lookup_concurrency,
            }))
    }

    pub fn orchestrator(&self) -> MutationOrchestrator<PipEnvironment> {
        MutationOrchestrator::new(Arc::clone(&self.manager))
            .with_timeout(self.settings.mutation_timeout())
    }
}
