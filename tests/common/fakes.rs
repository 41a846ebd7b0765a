//! Fake package manager and registry implementations
//!
//! The fake package manager reports a fixed listing and runs mutations as
//! `sh -c <script>`, so orchestrator tests exercise real processes.

#![allow(dead_code)]

use pip_pilot::{
    Environment, InstalledPackage, MutationKind, PackageManager, PipPilotError, Registry, Result,
};
use std::collections::HashMap;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct FakePackageManager {
    environment: Environment,
    installed: Vec<InstalledPackage>,
    listing_fails: bool,
    scripts: HashMap<String, String>,
    default_script: String,
    launch_program: Option<String>,
}

impl FakePackageManager {
    pub fn new(identity: &str) -> Self {
        Self {
            environment: Environment::new(identity),
            installed: Vec::new(),
            listing_fails: false,
            scripts: HashMap::new(),
            default_script: "echo done".to_string(),
            launch_program: None,
        }
    }

    pub fn with_installed(mut self, packages: &[(&str, &str)]) -> Self {
        self.installed = packages
            .iter()
            .map(|(name, version)| InstalledPackage::new(*name, *version))
            .collect();
        self
    }

    pub fn with_failing_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }

    /// Shell script run when mutating `package`
    pub fn with_script(mut self, package: &str, script: &str) -> Self {
        self.scripts.insert(package.to_string(), script.to_string());
        self
    }

    pub fn with_default_script(mut self, script: &str) -> Self {
        self.default_script = script.to_string();
        self
    }

    /// Make every mutation launch a program that does not exist
    pub fn with_missing_program(mut self) -> Self {
        self.launch_program = Some("/non/existent/pip-pilot-fake".to_string());
        self
    }
}

impl PackageManager for FakePackageManager {
    fn environment(&self) -> &Environment {
        &self.environment
    }

    fn list_installed(&self, timeout: Duration) -> Result<Vec<InstalledPackage>> {
        if self.listing_fails {
            return Err(PipPilotError::process_timeout("fake-pip", timeout.as_secs()));
        }
        Ok(self.installed.clone())
    }

    fn show_details(&self, name: &str, _timeout: Duration) -> Result<String> {
        Ok(format!("Name: {name}\n"))
    }

    fn tool_version(&self, _timeout: Duration) -> Result<String> {
        Ok("23.0".to_string())
    }

    fn mutation_command(&self, _kind: MutationKind, name: &str) -> Command {
        if let Some(program) = &self.launch_program {
            return Command::new(program);
        }
        let script = self.scripts.get(name).unwrap_or(&self.default_script);
        let mut command = Command::new("sh");
        command.args(["-c", script]);
        command
    }
}

/// Registry answering from a fixed table; unknown names are not found.
#[derive(Default)]
pub struct FakeRegistry {
    versions: Mutex<HashMap<String, String>>,
    unreachable: bool,
    calls: AtomicUsize,
    queried: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn with_versions(versions: &[(&str, &str)]) -> Self {
        let registry = Self::default();
        registry.set_versions(versions);
        registry
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn set_versions(&self, versions: &[(&str, &str)]) {
        let mut table = self.versions.lock().unwrap();
        table.clear();
        for (name, version) in versions {
            table.insert(name.to_string(), version.to_string());
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queried(&self) -> Vec<String> {
        let mut names = self.queried.lock().unwrap().clone();
        names.sort();
        names
    }
}

impl Registry for FakeRegistry {
    fn latest_version(&self, name: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queried.lock().unwrap().push(name.to_string());
        if self.unreachable {
            return Err(PipPilotError::RegistryTimeout {
                name: name.to_string(),
            });
        }
        self.versions
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| PipPilotError::RegistryNotFound {
                name: name.to_string(),
            })
    }
}
