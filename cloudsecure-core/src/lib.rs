//! CloudSecure Core Library
//!
//! Shared types for the CloudSecure CLI: credential resolution, the config
//! file model, request/response specs, API record types and the error
//! taxonomy.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{default_config_path, ConfigFile};
pub use credentials::{CredentialBundle, CredentialOverrides};
pub use error::*;
pub use types::*;
