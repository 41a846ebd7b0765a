//! Fake interpreter and isolated directories for CLI tests
//!
//! The fake interpreter answers `-m pip ...` the way pip would for a tiny
//! environment containing only `requests 2.0.0`.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Port 9 (discard) refuses connections, so registry lookups fail fast.
pub const UNREACHABLE_REGISTRY: &str = "http://127.0.0.1:9/pypi";

const FAKE_PYTHON: &str = r#"#!/bin/sh
# invoked as: <python> -m pip <subcommand> ...
case "$3" in
  list)
    echo '[{"name": "requests", "version": "2.0.0"}]'
    ;;
  install)
    echo "Collecting $5"
    echo "Successfully installed $5"
    ;;
  uninstall)
    echo "Found existing installation: $5"
    echo "ERROR: cannot uninstall $5" >&2
    exit 1
    ;;
  show)
    printf 'Name: %s\nVersion: 2.0.0\n' "$4"
    ;;
  --version)
    echo "pip 24.0 from /fake/site-packages/pip (python 3.12)"
    ;;
  *)
    exit 2
    ;;
esac
"#;

const BROKEN_PYTHON: &str = "#!/bin/sh\necho 'No module named pip' >&2\nexit 3\n";

pub struct CliSandbox {
    pub temp_dir: TempDir,
    pub python: PathBuf,
}

impl CliSandbox {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_script(FAKE_PYTHON)
    }

    /// A sandbox whose interpreter cannot run pip at all
    pub fn broken() -> anyhow::Result<Self> {
        Self::with_script(BROKEN_PYTHON)
    }

    fn with_script(script: &str) -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let python = temp_dir.path().join("python");
        write_executable(&python, script)?;

        let config_dir = temp_dir.path().join("config");
        fs::create_dir_all(&config_dir)?;
        fs::write(
            config_dir.join("config.json"),
            r#"{ "lookup_timeout_secs": 2, "list_timeout_secs": 10, "mutation_timeout_secs": 10 }"#,
        )?;

        Ok(Self { temp_dir, python })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.temp_dir.path().join("cache")
    }

    /// pip-pilot command bound to this sandbox's interpreter and directories
    pub fn command(&self) -> anyhow::Result<Command> {
        let mut cmd = Command::cargo_bin("pip-pilot")?;
        cmd.env("PIP_PILOT_PYTHON", &self.python)
            .env("PIP_PILOT_REGISTRY", UNREACHABLE_REGISTRY)
            .env("PIP_PILOT_CACHE_DIR", self.cache_dir())
            .env("PIP_PILOT_CONFIG_DIR", self.temp_dir.path().join("config"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        Ok(cmd)
    }
}

#[cfg(unix)]
fn write_executable(path: &Path, content: &str) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, content)?;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn write_executable(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, content)
}
