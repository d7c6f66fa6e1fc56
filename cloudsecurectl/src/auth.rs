//! Authentication schemes for the session client.
//!
//! The API accepts either a Basic header built from the service account
//! key/token pair, or a bearer token obtained from a token endpoint.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cloudsecure_core::{CloudSecureError, CredentialBundle, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Value for the `Authorization` header plus its expiry.
#[derive(Clone)]
pub struct AccessToken {
    header_value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    /// A token that never expires
    pub fn new(header_value: impl Into<String>) -> Self {
        Self {
            header_value: header_value.into(),
            expires_at: None,
        }
    }

    pub fn expiring_in(header_value: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            header_value: header_value.into(),
            expires_at: Some(Instant::now() + lifetime),
        }
    }

    pub fn header_value(&self) -> &str {
        &self.header_value
    }

    pub fn is_valid(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + EXPIRY_MARGIN < expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("header_value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Produces the credential the session client attaches to every request.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, http: &Client, bundle: &CredentialBundle)
        -> Result<AccessToken>;
}

/// `Authorization: Basic base64(key:token)`. No network round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuthenticator;

impl BasicAuthenticator {
    pub fn header_value(bundle: &CredentialBundle) -> String {
        let pair = format!(
            "{}:{}",
            bundle.service_account_key(),
            bundle.service_account_token()
        );
        format!("Basic {}", STANDARD.encode(pair))
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    async fn authenticate(
        &self,
        _http: &Client,
        bundle: &CredentialBundle,
    ) -> Result<AccessToken> {
        Ok(AccessToken::new(Self::header_value(bundle)))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Exchanges the service account key/token for a bearer token using the
/// OAuth2 client credentials grant.
#[derive(Debug, Clone)]
pub struct TokenExchangeAuthenticator {
    token_url: String,
}

impl TokenExchangeAuthenticator {
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
        }
    }
}

#[async_trait]
impl Authenticator for TokenExchangeAuthenticator {
    async fn authenticate(&self, http: &Client, bundle: &CredentialBundle) -> Result<AccessToken> {
        tracing::debug!(token_url = %self.token_url, "requesting access token");

        let response = http
            .post(&self.token_url)
            .header("X-Tenant-Id", bundle.tenant_id())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", bundle.service_account_key()),
                ("client_secret", bundle.service_account_token()),
            ])
            .send()
            .await
            .map_err(|e| {
                CloudSecureError::Authentication(format!(
                    "cannot reach token endpoint {}: {}",
                    self.token_url, e
                ))
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let reason = match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(err) => err.error_description.unwrap_or(err.error),
                Err(_) => format!("HTTP {}", status),
            };
            return Err(CloudSecureError::Authentication(format!(
                "token endpoint rejected the service account: {}",
                reason
            )));
        }

        let token: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            CloudSecureError::Authentication(format!("unreadable token response: {}", e))
        })?;

        let scheme = token.token_type.unwrap_or_else(|| "Bearer".to_string());
        let header_value = format!("{} {}", scheme, token.access_token);

        Ok(match token.expires_in {
            Some(secs) => AccessToken::expiring_in(header_value, Duration::from_secs(secs)),
            None => AccessToken::new(header_value),
        })
    }
}
