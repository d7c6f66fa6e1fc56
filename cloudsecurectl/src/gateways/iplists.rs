use super::{existing_names, list_all, Listing};
use crate::client::SessionClient;
use cloudsecure_core::api::{ImportOutcome, ImportStatus, IpListRecord};
use cloudsecure_core::{RequestSpec, Result};
use tracing::{info, warn};

const ACTIVE_PATH: &str = "sec_policy/active/ip_lists";
const DRAFT_PATH: &str = "sec_policy/draft/ip_lists";

/// IP lists in the active and draft security policy
pub struct IpListGateway<'a> {
    session: &'a SessionClient,
}

impl<'a> IpListGateway<'a> {
    pub fn new(session: &'a SessionClient) -> Self {
        Self { session }
    }

    /// IP lists of the active policy
    pub async fn list(&self) -> Result<Listing<IpListRecord>> {
        list_all(self.session, ACTIVE_PATH).await
    }

    /// Create draft IP lists for every entry whose name is not taken yet.
    ///
    /// Failing to fetch the existing lists aborts the import. A failed create
    /// is reported in its outcome and the import moves on.
    pub async fn import(&self, entries: Vec<IpListRecord>) -> Result<Vec<ImportOutcome>> {
        let mut existing = existing_names(self.session, DRAFT_PATH).await?;
        let mut outcomes = Vec::with_capacity(entries.len());

        for mut entry in entries {
            let name = entry.name.clone();
            if existing.contains(&name) {
                info!(name = %name, "IP list already exists");
                outcomes.push(ImportOutcome {
                    name,
                    status: ImportStatus::AlreadyExists,
                    detail: None,
                });
                continue;
            }

            // href belongs to the exported object, not the new one
            entry.href = None;
            let body = serde_json::to_value(&entry)?;

            let outcome = match self
                .session
                .send(RequestSpec::post(DRAFT_PATH).with_body(body))
                .await
            {
                Ok(_) => {
                    existing.insert(name.clone());
                    ImportOutcome {
                        name,
                        status: ImportStatus::Created,
                        detail: None,
                    }
                }
                Err(e) => {
                    warn!(name = %name, "failed to create IP list: {}", e);
                    ImportOutcome {
                        name,
                        status: ImportStatus::Failed,
                        detail: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_session, MockApi};
    use serde_json::json;

    fn ip_list(name: &str) -> IpListRecord {
        serde_json::from_value(json!({
            "name": name,
            "href": format!("/orgs/1/sec_policy/draft/ip_lists/{}", name),
            "ip_ranges": [{"from_ip": "10.0.0.0/8"}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_uses_active_policy() {
        let (mock, url) = MockApi::new().start().await.unwrap();
        mock.enqueue(
            "GET",
            "/api/v1/sec_policy/active/ip_lists",
            200,
            json!({"ip_lists": [{"name": "Any (0.0.0.0/0)", "href": "/ip_lists/1"}]}),
        );

        let session = test_session(&url);
        let listing = IpListGateway::new(&session).list().await.unwrap();

        assert_eq!(listing.label.as_deref(), Some("ip_lists"));
        assert_eq!(listing.records[0].name, "Any (0.0.0.0/0)");
    }

    #[tokio::test]
    async fn test_import_skips_existing_names() {
        let (mock, url) = MockApi::new().start().await.unwrap();
        mock.enqueue(
            "GET",
            "/api/v1/sec_policy/draft/ip_lists",
            200,
            json!({"ip_lists": [{"name": "corp", "href": "/ip_lists/1"}]}),
        );
        mock.enqueue(
            "POST",
            "/api/v1/sec_policy/draft/ip_lists",
            201,
            json!({"href": "/ip_lists/2"}),
        );

        let session = test_session(&url);
        let outcomes = IpListGateway::new(&session)
            .import(vec![ip_list("corp"), ip_list("lab"), ip_list("lab")])
            .await
            .unwrap();

        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                ImportStatus::AlreadyExists,
                ImportStatus::Created,
                ImportStatus::AlreadyExists
            ]
        );

        let posts: Vec<_> = mock
            .requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect();
        assert_eq!(posts.len(), 1);
        let body = posts[0].body.as_ref().unwrap();
        assert_eq!(body["name"], json!("lab"));
        assert!(body.get("href").is_none());
    }

    #[tokio::test]
    async fn test_import_reports_failed_creates() {
        let (mock, url) = MockApi::new().start().await.unwrap();
        mock.enqueue("GET", "/api/v1/sec_policy/draft/ip_lists", 200, json!([]));
        mock.enqueue(
            "POST",
            "/api/v1/sec_policy/draft/ip_lists",
            406,
            json!([{"token": "invalid_ip_range", "message": "bad range"}]),
        );

        let session = test_session(&url);
        let outcomes = IpListGateway::new(&session)
            .import(vec![ip_list("broken")])
            .await
            .unwrap();

        assert_eq!(outcomes[0].status, ImportStatus::Failed);
        assert!(outcomes[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("invalid_ip_range: bad range"));
    }
}
