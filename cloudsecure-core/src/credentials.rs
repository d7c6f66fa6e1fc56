//! Credential resolution
//!
//! Each credential field is looked up in a fixed order of sources:
//! CLI flag, then config file, then environment variable. The first
//! non-empty value wins.

use crate::config::ConfigFile;
use crate::error::ConfigurationError;
use std::fmt;
use std::path::Path;

pub const ENV_SERVICE_ACCOUNT_KEY: &str = "IllumioCS_ServiceAccountKey";
pub const ENV_API_URL: &str = "IllumioCS_ApiUrl";
pub const ENV_TENANT_ID: &str = "IllumioCS_TenantId";
pub const ENV_SERVICE_ACCOUNT_TOKEN: &str = "IllumioCS_ServiceAccountToken";

/// The four credential fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    ServiceAccountKey,
    ApiUrl,
    TenantId,
    ServiceAccountToken,
}

impl CredentialField {
    pub const ALL: [CredentialField; 4] = [
        CredentialField::ServiceAccountKey,
        CredentialField::ApiUrl,
        CredentialField::TenantId,
        CredentialField::ServiceAccountToken,
    ];

    /// Field name as used by CLI flags and the config file
    pub fn name(self) -> &'static str {
        match self {
            CredentialField::ServiceAccountKey => "service_account_key",
            CredentialField::ApiUrl => "api_url",
            CredentialField::TenantId => "tenant_id",
            CredentialField::ServiceAccountToken => "service_account_token",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            CredentialField::ServiceAccountKey => ENV_SERVICE_ACCOUNT_KEY,
            CredentialField::ApiUrl => ENV_API_URL,
            CredentialField::TenantId => ENV_TENANT_ID,
            CredentialField::ServiceAccountToken => ENV_SERVICE_ACCOUNT_TOKEN,
        }
    }
}

/// Credential values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub service_account_key: Option<String>,
    pub api_url: Option<String>,
    pub tenant_id: Option<String>,
    pub service_account_token: Option<String>,
}

impl CredentialOverrides {
    fn get(&self, field: CredentialField) -> Option<String> {
        match field {
            CredentialField::ServiceAccountKey => self.service_account_key.clone(),
            CredentialField::ApiUrl => self.api_url.clone(),
            CredentialField::TenantId => self.tenant_id.clone(),
            CredentialField::ServiceAccountToken => self.service_account_token.clone(),
        }
    }
}

impl ConfigFile {
    fn credential(&self, field: CredentialField) -> Option<String> {
        match field {
            CredentialField::ServiceAccountKey => self.service_account_key.clone(),
            CredentialField::ApiUrl => self.api_url.clone(),
            CredentialField::TenantId => self.tenant_id.clone(),
            CredentialField::ServiceAccountToken => self.service_account_token.clone(),
        }
    }
}

/// Immutable, fully-populated credentials for one process.
///
/// The only way to obtain one is through [`resolve`] or
/// [`resolve_with_file`], so all four fields are always non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    service_account_key: String,
    api_url: String,
    tenant_id: String,
    service_account_token: String,
}

impl CredentialBundle {
    pub fn service_account_key(&self) -> &str {
        &self.service_account_key
    }

    /// Normalized base URL, with scheme and without trailing slash
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn service_account_token(&self) -> &str {
        &self.service_account_token
    }
}

// Secrets never reach logs or error output.
impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("service_account_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("tenant_id", &self.tenant_id)
            .field("service_account_token", &"<redacted>")
            .finish()
    }
}

/// Resolve credentials, reading the config file at `config_path` if given.
pub fn resolve<E>(
    cli: &CredentialOverrides,
    config_path: Option<&Path>,
    env: E,
) -> Result<CredentialBundle, ConfigurationError>
where
    E: Fn(&str) -> Option<String>,
{
    let file = config_path.map(ConfigFile::load).transpose()?;
    resolve_with_file(cli, file.as_ref(), env)
}

/// Resolve credentials from an already-loaded config file.
///
/// `env` looks up an environment variable by name; pass
/// `|name| std::env::var(name).ok()` for the process environment.
pub fn resolve_with_file<E>(
    cli: &CredentialOverrides,
    file: Option<&ConfigFile>,
    env: E,
) -> Result<CredentialBundle, ConfigurationError>
where
    E: Fn(&str) -> Option<String>,
{
    let sources: [&dyn Fn(CredentialField) -> Option<String>; 3] = [
        &|field: CredentialField| cli.get(field),
        &|field: CredentialField| file.and_then(|f| f.credential(field)),
        &|field: CredentialField| env(field.env_var()),
    ];

    let lookup = |field: CredentialField| {
        sources.iter().find_map(|source| {
            source(field)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
    };

    let resolved = CredentialField::ALL.map(|field| (field, lookup(field)));
    let missing: Vec<&'static str> = resolved
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(field, _)| field.name())
        .collect();

    match resolved {
        [(_, Some(service_account_key)), (_, Some(api_url)), (_, Some(tenant_id)), (_, Some(service_account_token))] => {
            Ok(CredentialBundle {
                service_account_key,
                api_url: normalize_api_url(&api_url)?,
                tenant_id,
                service_account_token,
            })
        }
        _ => Err(ConfigurationError::MissingCredentials { fields: missing }),
    }
}

/// Normalize an API URL: bare hosts get `https://`, trailing slashes are removed.
pub fn normalize_api_url(url: &str) -> Result<String, ConfigurationError> {
    let url = url.trim();
    let (scheme, host) = url.split_once("://").unwrap_or(("https", url));

    if scheme != "http" && scheme != "https" {
        return Err(ConfigurationError::InvalidSetting {
            key: "api_url",
            reason: "must start with http:// or https://".to_string(),
        });
    }

    let host = host.trim_end_matches('/');
    if host.is_empty() {
        return Err(ConfigurationError::InvalidSetting {
            key: "api_url",
            reason: "host cannot be empty".to_string(),
        });
    }

    Ok(format!("{}://{}", scheme, host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn full_env() -> impl Fn(&str) -> Option<String> {
        env_from(&[
            (ENV_SERVICE_ACCOUNT_KEY, "env-key"),
            (ENV_API_URL, "env.illum.io"),
            (ENV_TENANT_ID, "env-tenant"),
            (ENV_SERVICE_ACCOUNT_TOKEN, "env-token"),
        ])
    }

    #[test]
    fn test_env_only() {
        let bundle = resolve_with_file(&CredentialOverrides::default(), None, full_env()).unwrap();
        assert_eq!(bundle.service_account_key(), "env-key");
        assert_eq!(bundle.api_url(), "https://env.illum.io");
        assert_eq!(bundle.tenant_id(), "env-tenant");
        assert_eq!(bundle.service_account_token(), "env-token");
    }

    #[test]
    fn test_cli_beats_env() {
        let cli = CredentialOverrides {
            tenant_id: Some("X".to_string()),
            ..Default::default()
        };
        let bundle = resolve_with_file(&cli, None, full_env()).unwrap();
        assert_eq!(bundle.tenant_id(), "X");
        assert_eq!(bundle.service_account_key(), "env-key");
    }

    #[test]
    fn test_precedence_chain_per_field() {
        let cli = CredentialOverrides {
            service_account_key: Some("cli-key".to_string()),
            ..Default::default()
        };
        let file = ConfigFile {
            service_account_key: Some("file-key".to_string()),
            tenant_id: Some("file-tenant".to_string()),
            ..Default::default()
        };

        let bundle = resolve_with_file(&cli, Some(&file), full_env()).unwrap();
        assert_eq!(bundle.service_account_key(), "cli-key");
        assert_eq!(bundle.tenant_id(), "file-tenant");
        assert_eq!(bundle.service_account_token(), "env-token");
    }

    #[test]
    fn test_empty_values_fall_through() {
        let cli = CredentialOverrides {
            tenant_id: Some("  ".to_string()),
            ..Default::default()
        };
        let file = ConfigFile {
            tenant_id: Some(String::new()),
            ..Default::default()
        };

        let bundle = resolve_with_file(&cli, Some(&file), full_env()).unwrap();
        assert_eq!(bundle.tenant_id(), "env-tenant");
    }

    #[test]
    fn test_missing_token_is_reported() {
        let env = env_from(&[
            (ENV_SERVICE_ACCOUNT_KEY, "k"),
            (ENV_API_URL, "cloud.illum.io"),
            (ENV_TENANT_ID, "t"),
        ]);
        let err = resolve_with_file(&CredentialOverrides::default(), None, env).unwrap_err();
        match err {
            ConfigurationError::MissingCredentials { fields } => {
                assert_eq!(fields, vec!["service_account_token"]);
            }
            other => panic!("Expected MissingCredentials, got {:?}", other),
        }
    }

    #[test]
    fn test_all_missing_fields_listed() {
        let err =
            resolve_with_file(&CredentialOverrides::default(), None, env_from(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required credentials: service_account_key, api_url, tenant_id, service_account_token"
        );
    }

    #[test]
    fn test_resolve_reads_config_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "service_account_key = \"fk\"\nservice_account_token = \"ft\"\ntenant_id = \"ften\"\napi_url = \"https://file.example.com/\""
        )
        .unwrap();

        let bundle = resolve(
            &CredentialOverrides::default(),
            Some(file.path()),
            env_from(&[]),
        )
        .unwrap();
        assert_eq!(bundle.api_url(), "https://file.example.com");
        assert_eq!(bundle.tenant_id(), "ften");
    }

    #[test]
    fn test_malformed_file_is_distinct_from_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml").unwrap();

        let err = resolve(&CredentialOverrides::default(), Some(file.path()), full_env())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedConfig { .. }));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cli = CredentialOverrides {
            service_account_key: Some("super-key".to_string()),
            service_account_token: Some("super-secret".to_string()),
            ..Default::default()
        };
        let bundle = resolve_with_file(&cli, None, full_env()).unwrap();
        let debug = format!("{:?}", bundle);
        assert!(!debug.contains("super-key"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("env-tenant"));
    }

    #[test]
    fn test_normalize_api_url() {
        assert_eq!(
            normalize_api_url("cloud.illum.io").unwrap(),
            "https://cloud.illum.io"
        );
        assert_eq!(
            normalize_api_url("http://localhost:3000///").unwrap(),
            "http://localhost:3000"
        );
        assert!(normalize_api_url("ftp://example.com").is_err());
        assert!(normalize_api_url("https://").is_err());
    }
}
