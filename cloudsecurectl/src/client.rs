//! Authenticated HTTP session for the CloudSecure API.

use crate::auth::{AccessToken, Authenticator, BasicAuthenticator, TokenExchangeAuthenticator};
use crate::config::CliConfig;
use cloudsecure_core::{
    CloudSecureError, CredentialBundle, Method, RequestSpec, ResponseBody, ResponseEnvelope,
    Result,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Tuning knobs for a [`SessionClient`]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_version: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from(&CliConfig::default())
    }
}

impl From<&CliConfig> for ClientSettings {
    fn from(config: &CliConfig) -> Self {
        Self {
            api_version: config.api_version.clone(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }
}

/// One authenticated session against the CloudSecure API.
///
/// Built once per invocation and shared by reference with every gateway.
/// Requests are issued one at a time.
///
/// # Retry Logic
///
/// - `401 Unauthorized`: the cached token is dropped, the session
///   re-authenticates once and repeats the request once. A second 401 is an
///   authentication error.
/// - `429` and `5xx`, timeouts and connection failures: retried up to
///   `max_retries` times with exponential backoff starting at `retry_delay`.
/// - Any other non-2xx status is returned as [`CloudSecureError::Api`].
pub struct SessionClient {
    http: Client,
    bundle: CredentialBundle,
    settings: ClientSettings,
    authenticator: Box<dyn Authenticator>,
    token: RwLock<Option<AccessToken>>,
}

impl SessionClient {
    /// Create a session using Basic authentication.
    pub fn new(bundle: CredentialBundle, settings: ClientSettings) -> Result<Self> {
        Self::with_authenticator(bundle, settings, Box::new(BasicAuthenticator))
    }

    /// Create a session from CLI configuration, picking the authentication
    /// scheme from `token_url`.
    pub fn from_config(bundle: CredentialBundle, config: &CliConfig) -> Result<Self> {
        let authenticator: Box<dyn Authenticator> = match &config.token_url {
            Some(url) => Box::new(TokenExchangeAuthenticator::new(url.clone())),
            None => Box::new(BasicAuthenticator),
        };
        Self::with_authenticator(bundle, ClientSettings::from(config), authenticator)
    }

    pub fn with_authenticator(
        bundle: CredentialBundle,
        settings: ClientSettings,
        authenticator: Box<dyn Authenticator>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("cloudsecurectl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CloudSecureError::transport_with_source("cannot create HTTP client", e))?;

        Ok(Self {
            http,
            bundle,
            settings,
            authenticator,
            token: RwLock::new(None),
        })
    }

    pub fn bundle(&self) -> &CredentialBundle {
        &self.bundle
    }

    /// Build the full URL for an API path
    pub fn url(&self, path: &str) -> String {
        let mut path = path.trim_start_matches('/').to_string();
        while path.contains("//") {
            path = path.replace("//", "/");
        }
        format!(
            "{}/api/{}/{}",
            self.bundle.api_url(),
            self.settings.api_version,
            path
        )
    }

    /// Return the cached token, authenticating first if there is none or it expired.
    async fn current_token(&self) -> Result<AccessToken> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_valid() {
                return Ok(token.clone());
            }
        }

        debug!("authenticating");
        let token = self
            .authenticator
            .authenticate(&self.http, &self.bundle)
            .await?;
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.settings
            .retry_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    async fn dispatch(
        &self,
        url: &str,
        spec: &RequestSpec,
        token: &AccessToken,
    ) -> std::result::Result<Response, reqwest::Error> {
        let method = match spec.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header("X-Tenant-Id", self.bundle.tenant_id())
            .header(AUTHORIZATION, token.header_value());

        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        request.send().await
    }

    async fn into_envelope(response: Response, path: &str) -> Result<ResponseEnvelope> {
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let text = response.text().await.map_err(|e| {
            CloudSecureError::transport_with_source(
                format!("failed to read response body from {}", path),
                e,
            )
        })?;

        Ok(ResponseEnvelope {
            status,
            headers,
            body: ResponseBody::decode(text),
        })
    }

    /// Send one request, applying authentication and the retry policy.
    pub async fn send(&self, spec: RequestSpec) -> Result<ResponseEnvelope> {
        let url = self.url(&spec.path);
        let mut reauthenticated = false;
        let mut attempt: u32 = 0;

        loop {
            let token = self.current_token().await?;

            debug!(
                method = %spec.method,
                url = %url,
                query = ?spec.query.keys().collect::<Vec<_>>(),
                has_body = spec.body.is_some(),
                headers = ?["accept", "x-tenant-id", "authorization"],
                attempt,
                "sending request"
            );

            match self.dispatch(&url, &spec, &token).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(status = status.as_u16(), url = %url, "received response");

                    if status == StatusCode::UNAUTHORIZED {
                        if reauthenticated {
                            return Err(CloudSecureError::Authentication(format!(
                                "{} {} was rejected after re-authenticating",
                                spec.method, spec.path
                            )));
                        }
                        warn!("token rejected, re-authenticating");
                        self.invalidate_token().await;
                        reauthenticated = true;
                        continue;
                    }

                    if is_retryable_status(status) {
                        if attempt < self.settings.max_retries {
                            let delay = self.backoff(attempt);
                            warn!(
                                status = status.as_u16(),
                                "request failed, retrying in {}ms (attempt {}/{})",
                                delay.as_millis(),
                                attempt + 1,
                                self.settings.max_retries
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(CloudSecureError::transport(format!(
                            "{} {} failed with HTTP {} after {} attempts",
                            spec.method,
                            spec.path,
                            status.as_u16(),
                            attempt + 1
                        )));
                    }

                    let envelope = Self::into_envelope(response, &spec.path).await?;
                    if status.is_success() {
                        return Ok(envelope);
                    }
                    return Err(CloudSecureError::Api {
                        status: envelope.status,
                        body: envelope.body.into_json(),
                    });
                }
                Err(e) if is_transient(&e) && attempt < self.settings.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "request failed ({}), retrying in {}ms (attempt {}/{})",
                        e,
                        delay.as_millis(),
                        attempt + 1,
                        self.settings.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(CloudSecureError::transport_with_source(
                        format!(
                            "{} {} failed after {} attempts",
                            spec.method,
                            spec.path,
                            attempt + 1
                        ),
                        e,
                    ));
                }
            }
        }
    }

    /// Send a request and return the decoded body as JSON.
    pub async fn send_json(&self, spec: RequestSpec) -> Result<serde_json::Value> {
        Ok(self.send(spec).await?.body.into_json())
    }

    /// Verify connectivity and credentials.
    pub async fn check(&self) -> Result<()> {
        self.send(RequestSpec::get("noop")).await.map(|_| ())
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}
