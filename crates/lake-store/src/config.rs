//! Connection settings for the content store
//!
//! Settings come from an optional TOML file with a `[store]` table, then
//! per-field overrides (command-line flags or environment variables) are
//! applied on top.
//!
//! ```toml
//! [store]
//! project_id = "abc123"
//! dataset = "production"
//! api_version = "2025-02-19"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_API_VERSION: &str = "2025-02-19";
pub const DEFAULT_API_HOST: &str = "api.sanity.io";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Where and how to reach the content store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub project_id: String,

    #[serde(default)]
    pub dataset: String,

    /// API token; never written back out
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_api_host")]
    pub api_host: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: String::new(),
            token: None,
            api_version: default_api_version(),
            api_host: default_api_host(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    store: StoreConfig,
}

/// Per-field overrides; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct StoreOverrides {
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub token: Option<String>,
    pub api_version: Option<String>,
    pub api_host: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl StoreConfig {
    /// Parse the `[store]` table of a TOML document
    pub fn parse(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.store)
    }

    /// Load and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Apply overrides on top of the current values
    pub fn with_overrides(mut self, overrides: StoreOverrides) -> Self {
        if let Some(project_id) = overrides.project_id {
            self.project_id = project_id;
        }
        if let Some(dataset) = overrides.dataset {
            self.dataset = dataset;
        }
        if overrides.token.is_some() {
            self.token = overrides.token;
        }
        if let Some(api_version) = overrides.api_version {
            self.api_version = api_version;
        }
        if let Some(api_host) = overrides.api_host {
            self.api_host = api_host;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        self
    }

    /// Check that the settings can address a dataset
    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_empty() {
            return Err(Error::Config("project id is required".to_string()));
        }
        if !self
            .project_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(Error::Config(format!(
                "project id '{}' must be lowercase alphanumeric",
                self.project_id
            )));
        }
        if self.dataset.is_empty() {
            return Err(Error::Config("dataset is required".to_string()));
        }
        if self.api_host.is_empty() || self.api_version.is_empty() {
            return Err(Error::Config("api host and version are required".to_string()));
        }
        Ok(())
    }

    /// `https://<project>.<host>/v<version>`
    pub fn base_url(&self) -> String {
        let version = self.api_version.trim_start_matches('v');
        format!("https://{}.{}/v{}", self.project_id, self.api_host, version)
    }
}
