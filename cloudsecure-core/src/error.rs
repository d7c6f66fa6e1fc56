//! Error types for the CloudSecure client

use thiserror::Error;

/// Process exit codes, following BSD `sysexits.h` where one fits.
pub mod exitcode {
    /// Successful termination
    pub const OK: i32 = 0;

    /// API, transport or otherwise unclassified failure
    pub const FAILURE: i32 = 1;

    /// Command line usage error
    pub const USAGE: i32 = 64;

    /// Permission denied
    pub const NOPERM: i32 = 77;

    /// Configuration error
    pub const CONFIG: i32 = 78;
}

/// Configuration failures, kept apart so a malformed file is never reported
/// as a missing credential.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// One or more credential fields were empty in every source
    #[error("missing required credentials: {}", .fields.join(", "))]
    MissingCredentials { fields: Vec<&'static str> },

    /// The config file could not be read or parsed
    #[error("malformed config file {path}: {reason}")]
    MalformedConfig { path: String, reason: String },

    /// A setting has an unusable value
    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

/// Error taxonomy for every CloudSecure operation
#[derive(Error, Debug)]
pub enum CloudSecureError {
    /// Missing or malformed credentials and settings
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Bad command arguments, caught before any request is sent
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Token acquisition or refresh failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network-level failure, or retries exhausted
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Non-2xx application-level response
    #[error("{}", api_error_message(*.status, .body))]
    Api {
        status: u16,
        body: serde_json::Value,
    },

    /// Response or request payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`CloudSecureError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidParameter,
    Authentication,
    Transport,
    Api,
    Other,
}

impl CloudSecureError {
    /// Build a transport error without an underlying cause
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Build a transport error that keeps its cause for diagnostics
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Api { .. } => ErrorKind::Api,
            Self::Serialization(_) | Self::Io(_) => ErrorKind::Other,
        }
    }

    /// Exit code the CLI terminates with for this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Configuration => exitcode::CONFIG,
            ErrorKind::InvalidParameter => exitcode::USAGE,
            ErrorKind::Authentication => exitcode::NOPERM,
            ErrorKind::Transport | ErrorKind::Api | ErrorKind::Other => exitcode::FAILURE,
        }
    }
}

/// Render an error response the way the API reports it.
///
/// Lists of `{token, message}` entries become one line each; anything else is
/// printed as-is.
pub fn api_error_message(status: u16, body: &serde_json::Value) -> String {
    let mut message = format!("API call returned error code {}.", status);

    match body {
        serde_json::Value::Null => {}
        serde_json::Value::String(text) if text.is_empty() => {}
        serde_json::Value::String(text) => {
            message.push_str(" Errors:\n");
            message.push_str(text);
        }
        serde_json::Value::Array(errors) => {
            message.push_str(" Errors:");
            for error in errors {
                message.push('\n');
                match (
                    error.get("token").and_then(|t| t.as_str()),
                    error.get("message").and_then(|m| m.as_str()),
                    error.get("error"),
                ) {
                    (Some(token), Some(msg), _) => {
                        message.push_str(&format!("{}: {}", token, msg));
                    }
                    (_, _, Some(serde_json::Value::String(err))) => message.push_str(err),
                    (_, _, Some(err)) => message.push_str(&err.to_string()),
                    _ => message.push_str(&error.to_string()),
                }
            }
        }
        other => {
            message.push_str(" Errors:\n");
            message.push_str(&other.to_string());
        }
    }

    message
}

/// Result type alias for CloudSecure operations
pub type Result<T> = std::result::Result<T, CloudSecureError>;

impl From<serde_json::Error> for CloudSecureError {
    fn from(err: serde_json::Error) -> Self {
        CloudSecureError::Serialization(err.to_string())
    }
}
