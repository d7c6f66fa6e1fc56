//! Test utilities for CLI testing
//!
//! Provides a scripted mock of the CloudSecure API and test helpers.

use crate::auth::{AccessToken, Authenticator, BasicAuthenticator};
use crate::client::{ClientSettings, SessionClient};
use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Router,
};
use cloudsecure_core::credentials::resolve_with_file;
use cloudsecure_core::{CredentialBundle, CredentialOverrides};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// A request as seen by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    /// JSON body, if the request had one that parsed
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

type ResponseQueues = HashMap<(String, String), VecDeque<(u16, Value)>>;

/// Mock server state
#[derive(Debug, Clone, Default)]
struct MockState {
    responses: Arc<Mutex<ResponseQueues>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Mock CloudSecure API.
///
/// Responses are queued per method and path and served in order. The last
/// queued response for a route is repeated once the others are used up.
/// Unscripted routes answer 404.
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    state: MockState,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the mock server and return its base URL
    pub async fn start(self) -> Result<(Self, String)> {
        let app = Router::new()
            .fallback(handle)
            .with_state(self.state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        // Give the server a moment to start accepting connections
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok((self, format!("http://{}", addr)))
    }

    /// Queue a response for `method path`
    pub fn enqueue(&self, method: &str, path: &str, status: u16, body: Value) {
        self.state
            .responses
            .lock()
            .unwrap()
            .entry((method.to_uppercase(), path.to_string()))
            .or_default()
            .push_back((status, body));
    }

    /// All requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = Query::<BTreeMap<String, String>>::try_from_uri(&uri)
        .map(|Query(q)| q)
        .unwrap_or_default();

    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let recorded = RecordedRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body: serde_json::from_slice(&body).ok(),
    };
    state.requests.lock().unwrap().push(recorded);

    let key = (method.as_str().to_string(), uri.path().to_string());
    let next = {
        let mut responses = state.responses.lock().unwrap();
        responses.get_mut(&key).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        })
    };

    match next {
        Some((status, body)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(body)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("no route for {} {}", key.0, key.1)})),
        )
            .into_response(),
    }
}

/// Credentials pointing at `api_url`
pub fn test_bundle(api_url: &str) -> CredentialBundle {
    let overrides = CredentialOverrides {
        service_account_key: Some("test-key".to_string()),
        api_url: Some(api_url.to_string()),
        tenant_id: Some("test-tenant".to_string()),
        service_account_token: Some("test-token".to_string()),
    };
    resolve_with_file(&overrides, None, |_| None).unwrap()
}

/// Default settings with a 1ms retry delay
pub fn fast_settings() -> ClientSettings {
    ClientSettings {
        retry_delay: Duration::from_millis(1),
        ..ClientSettings::default()
    }
}

/// Session against `api_url` using Basic authentication
pub fn test_session(api_url: &str) -> SessionClient {
    SessionClient::new(test_bundle(api_url), fast_settings()).unwrap()
}

/// Basic authenticator that counts how often it is asked for a token
pub struct CountingAuthenticator {
    calls: Arc<AtomicUsize>,
}

impl CountingAuthenticator {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Authenticator for CountingAuthenticator {
    async fn authenticate(
        &self,
        http: &reqwest::Client,
        bundle: &CredentialBundle,
    ) -> cloudsecure_core::Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        BasicAuthenticator.authenticate(http, bundle).await
    }
}
