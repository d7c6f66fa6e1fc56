//! Typed operations over the CloudSecure API.
//!
//! Each gateway borrows the [`SessionClient`] and validates its inputs before
//! sending anything.

pub mod applications;
pub mod iplists;
pub mod onboarding;
pub mod resources;
pub mod services;

pub use applications::ApplicationGateway;
pub use iplists::IpListGateway;
pub use onboarding::OnboardingGateway;
pub use resources::{ResourceGateway, ResourceQuery};
pub use services::ServiceGateway;

use crate::client::SessionClient;
use cloudsecure_core::api::{Page, CONTINUATION_PARAM};
use cloudsecure_core::{CloudSecureError, RequestSpec, Result};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Records of one listing plus the collection name the API used, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub label: Option<String>,
    pub records: Vec<T>,
}

impl<T> Listing<T> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fetch every page of a listing.
///
/// `build` receives the continuation token of the previous page and the
/// number of records still wanted (when `limit` is set). The listing stops
/// when a page has no token or a token already followed, or once `limit`
/// records have been collected. Records are looked up under the last segment
/// of the request path (`sec_policy/active/ip_lists` reads `ip_lists`).
pub(crate) async fn collect_pages<F>(
    session: &SessionClient,
    mut build: F,
    limit: Option<usize>,
) -> Result<Page>
where
    F: FnMut(Option<&str>, Option<usize>) -> Result<RequestSpec>,
{
    let mut collected = Page::default();
    let mut token: Option<String> = None;
    let mut followed: HashSet<String> = HashSet::new();

    loop {
        let remaining = limit.map(|limit| limit.saturating_sub(collected.items.len()));
        if remaining == Some(0) {
            break;
        }

        let spec = build(token.as_deref(), remaining)?;
        let collection = spec.path.rsplit('/').next().map(str::to_string);
        let page = Page::from_collection(session.send_json(spec).await?, collection.as_deref());
        debug!(
            records = page.items.len(),
            has_more = page.continuation.is_some(),
            "received page"
        );

        if collected.label.is_none() {
            collected.label = page.label;
        }
        collected.items.extend(page.items);

        match page.continuation {
            Some(next) if followed.insert(next.clone()) => token = Some(next),
            Some(next) => {
                debug!(token = %next, "continuation token seen before, stopping");
                break;
            }
            None => break,
        }
    }

    if let Some(limit) = limit {
        collected.items.truncate(limit);
    }
    Ok(collected)
}

/// `GET path`, passing the continuation token as a query parameter
pub(crate) fn get_page(
    path: &'static str,
) -> impl FnMut(Option<&str>, Option<usize>) -> Result<RequestSpec> {
    move |token: Option<&str>, _: Option<usize>| {
        Ok(match token {
            Some(token) => RequestSpec::get(path).with_query(CONTINUATION_PARAM, token),
            None => RequestSpec::get(path),
        })
    }
}

/// Fetch a full listing and decode it as `T`.
pub(crate) async fn list_all<T>(session: &SessionClient, path: &'static str) -> Result<Listing<T>>
where
    T: DeserializeOwned,
{
    let page = collect_pages(session, get_page(path), None).await?;
    Ok(Listing {
        records: page.records()?,
        label: page.label,
    })
}

/// Names of every record in a listing. Records without a string name are ignored.
pub(crate) async fn existing_names(
    session: &SessionClient,
    path: &'static str,
) -> Result<HashSet<String>> {
    let page = collect_pages(session, get_page(path), None).await?;
    Ok(page
        .items
        .iter()
        .filter_map(|item| item.get("name").and_then(|n| n.as_str()))
        .map(str::to_string)
        .collect())
}

/// Split a comma-separated argument into an ordered set.
///
/// Entries are trimmed; empty entries are rejected and duplicates dropped.
pub fn split_csv(name: &str, value: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();

    for entry in value.split(',').map(str::trim) {
        if entry.is_empty() {
            return Err(CloudSecureError::invalid_parameter(format!(
                "--{} contains an empty entry: '{}'",
                name, value
            )));
        }
        if seen.insert(entry) {
            values.push(entry.to_string());
        }
    }

    Ok(values)
}

/// Require a non-blank argument and return it trimmed
pub fn require_non_empty(name: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CloudSecureError::invalid_parameter(format!(
            "--{} must not be empty",
            name
        )));
    }
    Ok(value.to_string())
}

/// Read a JSON array of entries for an import.
pub fn load_entries<T>(path: &Path) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    let content = std::fs::read_to_string(path).map_err(|e| {
        CloudSecureError::invalid_parameter(format!(
            "cannot read input file {}: {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        CloudSecureError::invalid_parameter(format!(
            "input file {} is not a JSON list of entries: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_session, MockApi};
    use cloudsecure_core::ErrorKind;
    use serde_json::{json, Value};
    use std::io::Write;

    #[test]
    fn test_split_csv_trims_and_dedups() {
        assert_eq!(
            split_csv("clouds", " aws, azure ,aws").unwrap(),
            vec!["aws".to_string(), "azure".to_string()]
        );
    }

    #[test]
    fn test_split_csv_rejects_empty_entries() {
        let err = split_csv("clouds", "aws,,azure").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(split_csv("clouds", "").is_err());
        assert!(split_csv("clouds", " ").is_err());
    }

    #[test]
    fn test_require_non_empty() {
        assert_eq!(require_non_empty("account-id", " 1234 ").unwrap(), "1234");
        assert!(require_non_empty("account-id", "  ").is_err());
    }

    #[test]
    fn test_load_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name": "a"}}, {{"name": "b"}}]"#).unwrap();

        let entries: Vec<Value> = load_entries(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_load_entries_errors_are_invalid_parameters() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = load_entries::<Value>(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err = load_entries::<Value>(Path::new("/nonexistent/entries.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[tokio::test]
    async fn test_collect_pages_follows_query_tokens() {
        let (mock, url) = MockApi::new().start().await.unwrap();
        mock.enqueue(
            "GET",
            "/api/v1/applications",
            200,
            json!({"applications": [{"name": "a"}], "next_page_token": "p2"}),
        );
        mock.enqueue(
            "GET",
            "/api/v1/applications",
            200,
            json!({"applications": [{"name": "b"}]}),
        );

        let session = test_session(&url);
        let page = collect_pages(&session, get_page("applications"), None)
            .await
            .unwrap();

        assert_eq!(page.label.as_deref(), Some("applications"));
        assert_eq!(page.items, vec![json!({"name": "a"}), json!({"name": "b"})]);

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].query.is_empty());
        assert_eq!(
            requests[1].query.get("continuation_token").map(String::as_str),
            Some("p2")
        );
    }

    #[tokio::test]
    async fn test_collect_pages_stops_on_repeated_token() {
        let (mock, url) = MockApi::new().start().await.unwrap();
        mock.enqueue(
            "GET",
            "/api/v1/applications",
            200,
            json!({"applications": [{"name": "a"}], "continuation_token": "same"}),
        );

        let session = test_session(&url);
        let page = collect_pages(&session, get_page("applications"), None)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_collect_pages_stops_on_token_cycle() {
        let (mock, url) = MockApi::new().start().await.unwrap();
        for (name, next) in [("a", "A"), ("b", "B"), ("c", "A")] {
            mock.enqueue(
                "GET",
                "/api/v1/applications",
                200,
                json!({"applications": [{"name": name}], "continuation_token": next}),
            );
        }

        let session = test_session(&url);
        let page = collect_pages(&session, get_page("applications"), None)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 3);
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_collect_pages_reads_collection_beside_side_arrays() {
        let (mock, url) = MockApi::new().start().await.unwrap();
        mock.enqueue(
            "GET",
            "/api/v1/applications",
            200,
            json!({
                "applications": [{"name": "a"}],
                "warnings": [{"code": "partial"}],
                "continuation_token": "p2"
            }),
        );
        mock.enqueue(
            "GET",
            "/api/v1/applications",
            200,
            json!({"applications": [{"name": "b"}], "errors": []}),
        );

        let session = test_session(&url);
        let page = collect_pages(&session, get_page("applications"), None)
            .await
            .unwrap();

        assert_eq!(page.label.as_deref(), Some("applications"));
        assert_eq!(page.items, vec![json!({"name": "a"}), json!({"name": "b"})]);
    }

    #[tokio::test]
    async fn test_collect_pages_aborts_on_error() {
        let (mock, url) = MockApi::new().start().await.unwrap();
        mock.enqueue(
            "GET",
            "/api/v1/applications",
            200,
            json!({"applications": [{"name": "a"}], "continuation_token": "p2"}),
        );
        mock.enqueue("GET", "/api/v1/applications", 400, json!({"error": "bad token"}));

        let session = test_session(&url);
        let err = collect_pages(&session, get_page("applications"), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Api);
    }
}
