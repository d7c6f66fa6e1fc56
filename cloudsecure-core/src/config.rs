//! Config file model and default path resolution
//!
//! The config file is TOML and carries the four credential fields plus
//! optional client settings:
//!
//! ```toml
//! service_account_key = "key-id"
//! service_account_token = "secret"
//! tenant_id = "tenant"
//! api_url = "cloud.illum.io"
//! timeout = 30
//! max_retries = 3
//! ```

use crate::error::ConfigurationError;
use crate::types::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of a CloudSecure CLI config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub service_account_key: Option<String>,
    pub api_url: Option<String>,
    pub tenant_id: Option<String>,
    pub service_account_token: Option<String>,

    /// Token exchange endpoint; Basic authentication is used when absent
    pub token_url: Option<String>,
    /// API version segment, e.g. `v1`
    pub api_version: Option<String>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
    /// Initial backoff delay in milliseconds
    pub retry_delay_ms: Option<u64>,
    pub output: Option<OutputFormat>,
    pub pretty: Option<bool>,
}

impl ConfigFile {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::MalformedConfig {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Self::parse(&content, path)
    }

    /// Parse config file content; `path` is only used for error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigurationError> {
        toml::from_str(content).map_err(|e| ConfigurationError::MalformedConfig {
            path: path.display().to_string(),
            reason: e.message().to_string(),
        })
    }

    /// Load the file at `explicit`, or the default file if it exists.
    ///
    /// An explicit path must exist. A missing default file is not an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>, ConfigurationError> {
        if let Some(path) = explicit {
            return Self::load(path).map(Some);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path).map(Some),
            _ => Ok(None),
        }
    }
}

/// Returns the default config file path.
///
/// Uses the XDG config directory when available:
/// - Linux: `$XDG_CONFIG_HOME/cloudsecure/cli.toml` or `~/.config/cloudsecure/cli.toml`
/// - macOS: `~/Library/Application Support/cloudsecure/cli.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cloudsecure").join("cli.toml"))
}
