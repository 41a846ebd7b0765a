//! Latest-version lookups against a package registry.
//!
//! [`PypiRegistry`] queries the PyPI JSON API (`GET {base}/{name}/json`) and
//! reads `info.version`. Each request is bounded by the client timeout.

use crate::core::error::{PipPilotError, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("pip-pilot/", env!("CARGO_PKG_VERSION"));

pub trait Registry: Send + Sync {
    fn latest_version(&self, name: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ProjectDocument {
    info: Option<ProjectInfo>,
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PypiRegistry {
    client: Client,
    base_url: String,
}

impl PypiRegistry {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn project_url(&self, name: &str) -> String {
        format!("{}/{}/json", self.base_url, name)
    }
}

impl Registry for PypiRegistry {
    fn latest_version(&self, name: &str) -> Result<String> {
        let response = self.client.get(self.project_url(name)).send().map_err(|e| {
            if e.is_timeout() {
                PipPilotError::RegistryTimeout {
                    name: name.to_string(),
                }
            } else {
                PipPilotError::Http(e)
            }
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PipPilotError::RegistryNotFound {
                name: name.to_string(),
            });
        }

        let body = response.error_for_status()?.text()?;
        version_from_document(name, &body)
    }
}

/// Pull `info.version` out of a project document.
pub fn version_from_document(name: &str, body: &str) -> Result<String> {
    let document: ProjectDocument = serde_json::from_str(body)?;
    document
        .info
        .and_then(|info| info.version)
        .filter(|version| !version.trim().is_empty())
        .ok_or_else(|| PipPilotError::RegistryMalformed {
            name: name.to_string(),
        })
}
