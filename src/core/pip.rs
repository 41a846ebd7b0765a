//! The package-manager collaborator and its pip implementation.
//!
//! The core never talks to pip directly; it goes through [`PackageManager`],
//! which [`PipEnvironment`] implements by running `<interpreter> -m pip ...`.
//! Tests substitute in-process fakes.

use crate::core::error::{PipPilotError, Result};
use crate::core::package::{Environment, InstalledPackage, MutationKind};
use crate::core::process::{program_name, run_captured};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const QUIET_FLAGS: [&str; 2] = ["--disable-pip-version-check", "--no-cache-dir"];

/// Capabilities the synchronizer and orchestrator need from a target environment.
pub trait PackageManager: Send + Sync {
    fn environment(&self) -> &Environment;

    /// Name the package manager itself is published under in the registry
    fn tool_name(&self) -> &str {
        "pip"
    }

    fn list_installed(&self, timeout: Duration) -> Result<Vec<InstalledPackage>>;

    fn show_details(&self, name: &str, timeout: Duration) -> Result<String>;

    /// Installed version of the package manager itself
    fn tool_version(&self, timeout: Duration) -> Result<String>;

    /// Command that performs `kind` on `name`. The orchestrator spawns it and
    /// owns its lifetime.
    fn mutation_command(&self, kind: MutationKind, name: &str) -> Command;
}

#[derive(Debug, Deserialize)]
struct ListedPackage {
    name: String,
    version: String,
}

#[derive(Debug, Clone)]
pub struct PipEnvironment {
    interpreter: PathBuf,
    environment: Environment,
}

impl PipEnvironment {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        let interpreter = interpreter.into();
        let environment = Environment::new(interpreter.to_string_lossy());
        Self {
            interpreter,
            environment,
        }
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    fn pip(&self) -> Command {
        let mut command = Command::new(&self.interpreter);
        command.args(["-m", "pip"]).env("PYTHONUNBUFFERED", "1");
        command
    }

    fn run_pip(&self, args: &[&str], timeout: Duration) -> Result<String> {
        let mut command = self.pip();
        command.args(args);
        let program = program_name(&command);

        let output = run_captured(command, timeout)?;
        if !output.success() {
            return Err(PipPilotError::process_failed(
                program,
                output.code,
                output.combined(),
            ));
        }
        Ok(output.stdout)
    }
}

impl PackageManager for PipEnvironment {
    fn environment(&self) -> &Environment {
        &self.environment
    }

    fn list_installed(&self, timeout: Duration) -> Result<Vec<InstalledPackage>> {
        let mut args = vec!["list", "--format=json"];
        args.extend(QUIET_FLAGS);
        let stdout = self.run_pip(&args, timeout)?;
        parse_pip_list(&stdout)
    }

    fn show_details(&self, name: &str, timeout: Duration) -> Result<String> {
        self.run_pip(&["show", name], timeout)
    }

    fn tool_version(&self, timeout: Duration) -> Result<String> {
        let stdout = self.run_pip(&["--version"], timeout)?;
        parse_pip_version(&stdout).ok_or_else(|| {
            PipPilotError::process_failed(
                program_name(&self.pip()),
                Some(0),
                format!("unexpected version output: {}", stdout.trim()),
            )
        })
    }

    fn mutation_command(&self, kind: MutationKind, name: &str) -> Command {
        let mut command = self.pip();
        match kind {
            MutationKind::Install | MutationKind::Update => {
                command.args(["install", "--upgrade", name]).args(QUIET_FLAGS);
            }
            MutationKind::Uninstall => {
                command.args(["uninstall", "-y", name]);
            }
        }
        command
    }
}

/// Parse `pip list --format=json` output into `(name, version)` pairs.
pub fn parse_pip_list(stdout: &str) -> Result<Vec<InstalledPackage>> {
    let listed: Vec<ListedPackage> =
        serde_json::from_str(stdout.trim()).map_err(PipPilotError::MalformedListing)?;
    Ok(listed
        .into_iter()
        .map(|pkg| InstalledPackage::new(pkg.name, pkg.version))
        .collect())
}

/// Extract the version from `pip 24.0 from /usr/lib/python3/site-packages/pip (python 3.12)`.
pub fn parse_pip_version(stdout: &str) -> Option<String> {
    let mut tokens = stdout.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some("pip"), Some(version)) => Some(version.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_parse_pip_list() -> Result<()> {
        let stdout = r#"[{"name": "requests", "version": "2.0.0"}, {"name": "Flask", "version": "1.0.0"}]"#;
        let packages = parse_pip_list(stdout)?;
        assert_eq!(
            packages,
            vec![
                InstalledPackage::new("requests", "2.0.0"),
                InstalledPackage::new("Flask", "1.0.0"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_pip_list_ignores_extra_fields() -> Result<()> {
        let stdout = r#"[{"name": "mypkg", "version": "0.1", "editable_project_location": "/src/mypkg"}]"#;
        assert_eq!(parse_pip_list(stdout)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_parse_pip_list_rejects_freeze_format() {
        let result = parse_pip_list("requests==2.0.0\nflask==1.0.0\n");
        assert!(matches!(result, Err(PipPilotError::MalformedListing(_))));
    }

    #[test]
    fn test_parse_pip_version() {
        assert_eq!(
            parse_pip_version("pip 24.0 from /usr/lib/python3/site-packages/pip (python 3.12)\n"),
            Some("24.0".to_string())
        );
        assert_eq!(parse_pip_version("No module named pip"), None);
    }

    #[test]
    fn test_environment_identity_is_interpreter_path() {
        let pip = PipEnvironment::new("/opt/venv/bin/python");
        assert_eq!(pip.environment().identity, "/opt/venv/bin/python");
        assert_eq!(pip.interpreter(), Path::new("/opt/venv/bin/python"));
    }

    #[test]
    fn test_update_command_upgrades() {
        let pip = PipEnvironment::new("python3");
        let command = pip.mutation_command(MutationKind::Update, "flask");
        assert_eq!(command.get_program().to_string_lossy(), "python3");
        assert_eq!(
            args_of(&command),
            vec![
                "-m",
                "pip",
                "install",
                "--upgrade",
                "flask",
                "--disable-pip-version-check",
                "--no-cache-dir"
            ]
        );
    }

    #[test]
    fn test_install_matches_update() {
        let pip = PipEnvironment::new("python3");
        assert_eq!(
            args_of(&pip.mutation_command(MutationKind::Install, "flask")),
            args_of(&pip.mutation_command(MutationKind::Update, "flask"))
        );
    }

    #[test]
    fn test_uninstall_skips_confirmation() {
        let pip = PipEnvironment::new("python3");
        let command = pip.mutation_command(MutationKind::Uninstall, "flask");
        assert_eq!(args_of(&command), vec!["-m", "pip", "uninstall", "-y", "flask"]);
    }
}
