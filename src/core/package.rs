//! Package inventory data structures.
//!
//! This module defines the records exchanged between the synchronizer, the cache
//! and the presentation layer, together with the environment identity used to
//! key cached inventories.
//!
//! # Public API
//! - [`Environment`]: Stable identity of a target package-manager installation
//! - [`InstalledPackage`]: A `(name, version)` pair as reported by the package manager
//! - [`PackageRecord`]: An installed package annotated with its latest registry version
//! - [`MutationKind`]: The mutating operations the orchestrator can run
//!
//! # Identity Rules
//! - Package names are case-insensitive; lookups compare lower-cased names
//! - An environment is identified by its fingerprint, never by its raw path

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of the environment an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    pub identity: String,
}

impl Environment {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }

    /// Fixed-length hex digest of the identity, safe to use as a file name.
    pub fn fingerprint(&self) -> String {
        format!("{:x}", md5::compute(self.identity.as_bytes()))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

impl InstalledPackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// An installed package annotated with staleness information.
///
/// `up_to_date` always equals `installed_version == latest_version`. Build
/// records through [`PackageRecord::resolved`] or [`PackageRecord::degraded`]
/// so the invariant holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub installed_version: String,
    pub latest_version: String,
    pub up_to_date: bool,
}

impl PackageRecord {
    /// Record for a package whose latest version is known.
    pub fn resolved(
        name: impl Into<String>,
        installed_version: impl Into<String>,
        latest_version: impl Into<String>,
    ) -> Self {
        let installed_version = installed_version.into();
        let latest_version = latest_version.into();
        Self {
            name: name.into(),
            up_to_date: installed_version == latest_version,
            installed_version,
            latest_version,
        }
    }

    /// Record for a package whose latest version could not be determined.
    /// Unknown is treated as current.
    pub fn degraded(name: impl Into<String>, installed_version: impl Into<String>) -> Self {
        let installed_version = installed_version.into();
        Self {
            name: name.into(),
            latest_version: installed_version.clone(),
            installed_version,
            up_to_date: true,
        }
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.key() == name.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    Install,
    Update,
    Uninstall,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Install => "install",
            MutationKind::Update => "update",
            MutationKind::Uninstall => "uninstall",
        }
    }

    /// Past-tense verb used in result messages
    pub fn past_tense(&self) -> &'static str {
        match self {
            MutationKind::Install => "installed",
            MutationKind::Update => "updated",
            MutationKind::Uninstall => "uninstalled",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive lookup of a package by name.
pub fn find_package<'a>(records: &'a [PackageRecord], name: &str) -> Option<&'a PackageRecord> {
    records.iter().find(|record| record.matches_name(name))
}

/// Records whose lower-cased name contains `needle`, in input order.
pub fn filter_by_name<'a>(records: &'a [PackageRecord], needle: &str) -> Vec<&'a PackageRecord> {
    let needle = needle.trim().to_lowercase();
    records
        .iter()
        .filter(|record| record.key().contains(&needle))
        .collect()
}

pub fn sort_by_name(records: &mut [PackageRecord]) {
    records.sort_by_key(|record| record.key());
}

/// Outdated packages first, each group ordered by name.
pub fn sort_outdated_first(records: &mut [PackageRecord]) {
    records.sort_by(|a, b| a.up_to_date.cmp(&b.up_to_date).then_with(|| a.key().cmp(&b.key())));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic_and_fixed_length() {
        let env = Environment::new("/usr/bin/python3");
        assert_eq!(env.fingerprint(), env.fingerprint());
        assert_eq!(env.fingerprint().len(), 32);

        let other = Environment::new("C:\\Program Files\\Python312\\python.exe");
        assert_eq!(other.fingerprint().len(), 32);
        assert_ne!(env.fingerprint(), other.fingerprint());
        assert!(other.fingerprint().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_resolved_record_tracks_equality() {
        let current = PackageRecord::resolved("requests", "2.0.0", "2.0.0");
        assert!(current.up_to_date);

        let stale = PackageRecord::resolved("flask", "1.0.0", "2.1.0");
        assert!(!stale.up_to_date);
        assert_eq!(stale.latest_version, "2.1.0");
    }

    #[test]
    fn test_degraded_record_falls_back_to_installed() {
        let record = PackageRecord::degraded("numpy", "1.26.4");
        assert!(record.up_to_date);
        assert_eq!(record.latest_version, "1.26.4");
    }

    #[test]
    fn test_find_package_ignores_case() {
        let records = vec![
            PackageRecord::resolved("Flask", "1.0.0", "2.1.0"),
            PackageRecord::resolved("requests", "2.0.0", "2.0.0"),
        ];
        assert_eq!(find_package(&records, "flask").map(|r| r.name.as_str()), Some("Flask"));
        assert_eq!(find_package(&records, "REQUESTS").map(|r| r.name.as_str()), Some("requests"));
        assert!(find_package(&records, "django").is_none());
    }

    #[test]
    fn test_filter_by_name_is_substring_match() {
        let records = vec![
            PackageRecord::resolved("Flask", "1.0.0", "2.1.0"),
            PackageRecord::resolved("flask-cors", "4.0.0", "4.0.0"),
            PackageRecord::resolved("requests", "2.0.0", "2.0.0"),
        ];
        let hits = filter_by_name(&records, " FLASK ");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_sort_outdated_first() {
        let mut records = vec![
            PackageRecord::resolved("b-current", "1", "1"),
            PackageRecord::resolved("z-stale", "1", "2"),
            PackageRecord::resolved("a-current", "1", "1"),
            PackageRecord::resolved("c-stale", "1", "2"),
        ];
        sort_outdated_first(&mut records);
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c-stale", "z-stale", "a-current", "b-current"]);
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let mut records = vec![
            PackageRecord::resolved("requests", "1", "1"),
            PackageRecord::resolved("Flask", "1", "1"),
        ];
        sort_by_name(&mut records);
        assert_eq!(records[0].name, "Flask");
    }
}
