//! Registration of cloud flow log destinations.

use super::{require_non_empty, split_csv};
use crate::client::SessionClient;
use cloudsecure_core::api::{CloudCredentialsRequest, FlowType, OnboardResult};
use cloudsecure_core::{CloudSecureError, RequestSpec, Result};
use tracing::info;

const CLOUD_CREDENTIALS_PATH: &str = "integrations/cloud_credentials";

pub struct OnboardingGateway<'a> {
    session: &'a SessionClient,
}

impl<'a> OnboardingGateway<'a> {
    pub fn new(session: &'a SessionClient) -> Self {
        Self { session }
    }

    /// Register an Azure storage account as the flow log destination of a subscription.
    pub async fn azure_storage_account(
        &self,
        subscription_id: &str,
        storage_account: &str,
    ) -> Result<OnboardResult> {
        let request = CloudCredentialsRequest {
            subscription_id: Some(require_non_empty("subscription_id", subscription_id)?),
            account_id: None,
            flow_type: FlowType::Azure,
            destinations: vec![require_non_empty("storage_account", storage_account)?],
        };
        self.submit(request).await
    }

    /// Register S3 buckets as flow log destinations of an AWS account.
    ///
    /// `arns` is a comma-separated list of bucket ARNs.
    pub async fn aws_s3_bucket(&self, account_id: &str, arns: &str) -> Result<OnboardResult> {
        let account_id = require_non_empty("account-id", account_id)?;
        let arns = split_csv("arns", arns)?;
        if let Some(bad) = arns.iter().find(|arn| !arn.starts_with("arn:")) {
            return Err(CloudSecureError::invalid_parameter(format!(
                "'{}' is not an ARN",
                bad
            )));
        }

        let request = CloudCredentialsRequest {
            subscription_id: None,
            account_id: Some(account_id),
            flow_type: FlowType::Aws,
            destinations: arns,
        };
        self.submit(request).await
    }

    async fn submit(&self, request: CloudCredentialsRequest) -> Result<OnboardResult> {
        info!(
            flow_type = ?request.flow_type,
            destinations = request.destinations.len(),
            "registering flow log destinations"
        );

        let body = serde_json::to_value(&request)?;
        let response = self
            .session
            .send_json(RequestSpec::post(CLOUD_CREDENTIALS_PATH).with_body(body))
            .await?;

        Ok(OnboardResult {
            flow_type: request.flow_type,
            destinations: request.destinations,
            response,
        })
    }
}
