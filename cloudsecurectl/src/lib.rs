//! CloudSecure CLI Library
//!
//! This library provides the core functionality for the CloudSecure CLI tool.
//!
//! # Public API
//!
//! The primary public API is the [`client::SessionClient`], an authenticated
//! session against the CloudSecure API, and the typed operations in
//! [`gateways`]. Configuration types are available via [`config::CliConfig`]
//! and [`config::ConfigBuilder`].
//!
//! ```no_run
//! use cloudsecure_core::credentials::resolve;
//! use cloudsecure_core::CredentialOverrides;
//! use cloudsecurectl::client::SessionClient;
//! use cloudsecurectl::config::CliConfig;
//! use cloudsecurectl::gateways::ApplicationGateway;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let bundle = resolve(&CredentialOverrides::default(), None, |name| {
//!     std::env::var(name).ok()
//! })?;
//! let session = SessionClient::from_config(bundle, &CliConfig::default())?;
//!
//! let applications = ApplicationGateway::new(&session).list().await?;
//! println!("{} applications", applications.records.len());
//! # Ok(())
//! # }
//! ```

/// Authentication schemes used by the session client.
pub mod auth;

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// HTTP session for communicating with the CloudSecure API.
pub mod client;

/// Configuration types for the CLI tool.
pub mod config;

/// Output formatting for API records.
pub mod format;

pub mod gateways;

#[cfg(test)]
pub mod test_utils;
