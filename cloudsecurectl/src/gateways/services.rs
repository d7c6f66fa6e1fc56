use super::{existing_names, list_all, Listing};
use crate::client::SessionClient;
use cloudsecure_core::api::{ImportOutcome, ImportStatus, ServiceRecord};
use cloudsecure_core::{RequestSpec, Result};
use serde_json::json;
use tracing::{info, warn};

const DRAFT_PATH: &str = "sec_policy/draft/services";

/// Description sent for services exported without one
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

/// Services in the draft security policy
pub struct ServiceGateway<'a> {
    session: &'a SessionClient,
}

impl<'a> ServiceGateway<'a> {
    pub fn new(session: &'a SessionClient) -> Self {
        Self { session }
    }

    pub async fn list(&self) -> Result<Listing<ServiceRecord>> {
        list_all(self.session, DRAFT_PATH).await
    }

    /// Create draft services for every entry that has ports and a new name.
    pub async fn import(&self, entries: Vec<ServiceRecord>) -> Result<Vec<ImportOutcome>> {
        let mut existing = existing_names(self.session, DRAFT_PATH).await?;
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            let name = entry.name;

            let Some(service_ports) = entry.service_ports else {
                outcomes.push(ImportOutcome {
                    name,
                    status: ImportStatus::Skipped,
                    detail: Some("no service_ports".to_string()),
                });
                continue;
            };

            if existing.contains(&name) {
                info!(name = %name, "service already exists");
                outcomes.push(ImportOutcome {
                    name,
                    status: ImportStatus::AlreadyExists,
                    detail: None,
                });
                continue;
            }

            let description = entry
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

            let body = json!({
                "name": name,
                "description": description,
                "service_ports": service_ports,
            });

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
                    warn!(name = %name, "failed to create service: {}", e);
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
