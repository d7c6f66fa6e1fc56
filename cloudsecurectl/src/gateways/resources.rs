//! Cloud inventory: resources and their object types.

use super::{collect_pages, split_csv, Listing};
use crate::client::SessionClient;
use cloudsecure_core::api::{
    ObjectTypeRecord, ResourceListRequest, ResourceRecord, SortBy, CONTINUATION_PARAM,
};
use cloudsecure_core::{CloudSecureError, RequestSpec, Result};

const RESOURCES_PATH: &str = "bridge/resources";
const METADATA_PATH: &str = "inventory/metadata";

pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_CLOUD: &str = "aws";

/// Validated filters for a resource listing
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceQuery {
    /// Upper bound on records fetched
    pub limit: usize,
    pub clouds: Vec<String>,
    pub object_types: Option<Vec<String>>,
    pub account_ids: Option<Vec<String>>,
}

impl Default for ResourceQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            clouds: vec![DEFAULT_CLOUD.to_string()],
            object_types: None,
            account_ids: None,
        }
    }
}

impl ResourceQuery {
    /// Build a query from raw command-line values.
    pub fn parse(
        limit: i64,
        clouds: Option<&str>,
        object_types: Option<&str>,
        account_ids: Option<&str>,
    ) -> Result<Self> {
        if limit <= 0 {
            return Err(CloudSecureError::invalid_parameter(format!(
                "--limit must be a positive integer, got {}",
                limit
            )));
        }
        let limit = usize::try_from(limit).map_err(|_| {
            CloudSecureError::invalid_parameter(format!("--limit {} is too large", limit))
        })?;

        Ok(Self {
            limit,
            clouds: parse_clouds(clouds)?,
            object_types: object_types
                .map(|v| split_csv("object_types", v))
                .transpose()?,
            account_ids: account_ids
                .map(|v| split_csv("account_ids", v))
                .transpose()?,
        })
    }

    fn body(&self, remaining: usize, continuation_token: Option<&str>) -> ResourceListRequest {
        ResourceListRequest {
            max_results: u32::try_from(remaining).unwrap_or(u32::MAX),
            sort_by: SortBy::default(),
            clouds: self.clouds.clone(),
            object_types: self.object_types.clone(),
            account_ids: self.account_ids.clone(),
            continuation_token: continuation_token.map(str::to_string),
        }
    }
}

/// Split `--clouds`, defaulting to AWS when absent
pub fn parse_clouds(clouds: Option<&str>) -> Result<Vec<String>> {
    match clouds {
        Some(value) => split_csv("clouds", value),
        None => Ok(vec![DEFAULT_CLOUD.to_string()]),
    }
}

pub struct ResourceGateway<'a> {
    session: &'a SessionClient,
}

impl<'a> ResourceGateway<'a> {
    pub fn new(session: &'a SessionClient) -> Self {
        Self { session }
    }

    /// List inventory resources, fetching at most `query.limit` records.
    pub async fn list(&self, query: &ResourceQuery) -> Result<Listing<ResourceRecord>> {
        let page = collect_pages(
            self.session,
            |token, remaining| {
                let body = query.body(remaining.unwrap_or(query.limit), token);
                Ok(RequestSpec::post(RESOURCES_PATH).with_body(serde_json::to_value(body)?))
            },
            Some(query.limit),
        )
        .await?;

        Ok(Listing {
            records: page.records()?,
            label: page.label,
        })
    }

    /// Object types known for the given clouds.
    pub async fn object_types(&self, clouds: &[String]) -> Result<Listing<ObjectTypeRecord>> {
        let clouds = clouds.join(",");
        let page = collect_pages(
            self.session,
            |token, _| {
                let spec = RequestSpec::get(METADATA_PATH)
                    .with_query("clouds", clouds.as_str())
                    .with_query("metadata_type", "OBJECTTYPE");
                Ok(match token {
                    Some(token) => spec.with_query(CONTINUATION_PARAM, token),
                    None => spec,
                })
            },
            None,
        )
        .await?;

        Ok(Listing {
            records: page.records()?,
            label: page.label,
        })
    }
}
