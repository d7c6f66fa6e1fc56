//! CLI configuration management
//!
//! Client settings (timeouts, retries, output) resolved from the config file
//! and command-line flags. Credentials are resolved separately by
//! [`cloudsecure_core::credentials`].

use cloudsecure_core::{ConfigFile, ConfigurationError, OutputFormat, OutputSpec};
use serde::Serialize;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CliConfig {
    /// Token exchange endpoint; Basic authentication when `None`
    pub token_url: Option<String>,

    /// API version path segment
    pub api_version: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Retries for 429/5xx responses and transient network failures
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds, doubled on each retry
    pub retry_delay_ms: u64,

    /// Default output format
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    pub pretty: bool,

    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            token_url: None,
            api_version: "v1".to_string(),
            timeout: 30,
            max_retries: 3,
            retry_delay_ms: 500,
            output_format: OutputFormat::Table,
            pretty: false,
            verbose: false,
        }
    }
}

impl CliConfig {
    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn output_spec(&self) -> OutputSpec {
        OutputSpec {
            format: self.output_format,
            pretty: self.pretty,
        }
    }
}

/// Builder for CLI configuration with validation and priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. CLI arguments
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    token_url: Option<String>,
    api_version: Option<String>,
    timeout: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    output_format: Option<OutputFormat>,
    pretty: Option<bool>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Take settings from a loaded config file. Values already set win.
    pub fn with_config_file(self, file: Option<&ConfigFile>) -> Result<Self, ConfigurationError> {
        let Some(file) = file else {
            return Ok(self);
        };

        if let Some(url) = &file.token_url {
            Self::validate_token_url(url)?;
        }
        if let Some(version) = &file.api_version {
            Self::validate_api_version(version)?;
        }
        if let Some(timeout) = file.timeout {
            Self::validate_timeout(timeout)?;
        }
        if let Some(retries) = file.max_retries {
            Self::validate_max_retries(retries)?;
        }

        Ok(Self {
            token_url: self.token_url.or_else(|| file.token_url.clone()),
            api_version: self.api_version.or_else(|| file.api_version.clone()),
            timeout: self.timeout.or(file.timeout),
            max_retries: self.max_retries.or(file.max_retries),
            retry_delay_ms: self.retry_delay_ms.or(file.retry_delay_ms),
            output_format: self.output_format.or(file.output),
            pretty: self.pretty.or(file.pretty),
            verbose: self.verbose,
        })
    }

    /// Set token exchange URL (with validation)
    pub fn with_token_url(mut self, url: impl Into<String>) -> Result<Self, ConfigurationError> {
        let url = url.into();
        Self::validate_token_url(&url)?;
        self.token_url = Some(url);
        Ok(self)
    }

    /// Set timeout (with validation)
    pub fn with_timeout(mut self, timeout: u64) -> Result<Self, ConfigurationError> {
        Self::validate_timeout(timeout)?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    pub fn with_max_retries(mut self, retries: u32) -> Result<Self, ConfigurationError> {
        Self::validate_max_retries(retries)?;
        self.max_retries = Some(retries);
        Ok(self)
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = Some(pretty);
        self
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<CliConfig, ConfigurationError> {
        let defaults = CliConfig::default();

        let api_version = self.api_version.unwrap_or(defaults.api_version);
        Self::validate_api_version(&api_version)?;

        Ok(CliConfig {
            token_url: self.token_url,
            api_version,
            timeout: self.timeout.unwrap_or(defaults.timeout),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(defaults.retry_delay_ms),
            output_format: self.output_format.unwrap_or(defaults.output_format),
            pretty: self.pretty.unwrap_or(defaults.pretty),
            verbose: self.verbose.unwrap_or(defaults.verbose),
        })
    }

    fn validate_token_url(url: &str) -> Result<(), ConfigurationError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigurationError::InvalidSetting {
                key: "token_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        Ok(())
    }

    fn validate_api_version(version: &str) -> Result<(), ConfigurationError> {
        if version.is_empty() || version.contains('/') {
            return Err(ConfigurationError::InvalidSetting {
                key: "api_version",
                reason: format!("'{}' is not a version segment", version),
            });
        }
        Ok(())
    }

    fn validate_timeout(timeout: u64) -> Result<(), ConfigurationError> {
        if timeout == 0 || timeout > 300 {
            return Err(ConfigurationError::InvalidSetting {
                key: "timeout",
                reason: "must be between 1 and 300 seconds".to_string(),
            });
        }
        Ok(())
    }

    fn validate_max_retries(retries: u32) -> Result<(), ConfigurationError> {
        if retries > 10 {
            return Err(ConfigurationError::InvalidSetting {
                key: "max_retries",
                reason: "must be at most 10".to_string(),
            });
        }
        Ok(())
    }
}
