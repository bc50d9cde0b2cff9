//! Configuration file parsing for .crier.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::report::Policy;

/// Environment variable consulted when `[api] token` is unset.
pub const TOKEN_ENV: &str = "CRIER_API_TOKEN";

/// Main configuration structure for .crier.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrierConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub reporter: Policy,

    #[serde(default)]
    pub urls: UrlsConfig,
}

/// Review-system endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the review system (the client appends `/api/<method>`)
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Auth token — can also be set via the CRIER_API_TOKEN env var
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ApiConfig {
    /// Token from the config file, falling back to the environment.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV).ok())
    }
}

/// Link bases substituted into rendered comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlsConfig {
    /// Results directory serving persisted improvement patches
    #[serde(default)]
    pub results: String,

    /// CI job browser, linked from task-failure lines
    #[serde(default)]
    pub jobs: String,

    /// "Report a problem" destination, linked from every summary comment
    #[serde(default)]
    pub report: String,
}

fn default_api_url() -> String {
    "http://localhost".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            token: None,
        }
    }
}

impl Default for UrlsConfig {
    fn default() -> Self {
        Self {
            results: String::new(),
            jobs: String::new(),
            report: String::new(),
        }
    }
}

impl CrierConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: CrierConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Find and load .crier.toml from the given directory or ancestors
    pub fn find_and_load(start_dir: &Path) -> Result<Self> {
        let mut current = start_dir;

        loop {
            let config_path = current.join(".crier.toml");
            if config_path.exists() {
                return Self::from_file(&config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        // No config found, use defaults
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
