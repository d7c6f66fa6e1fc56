//! API models for the CloudSecure REST API
//!
//! Record types document the fields the CLI knows about. Anything else the
//! API returns is kept in `extra` so it still reaches the output. Known fields
//! with an unexpected type are treated as absent.

use crate::error::{CloudSecureError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Response keys that carry a continuation token
pub const CONTINUATION_KEYS: [&str; 2] = ["continuation_token", "next_page_token"];

/// Request key used to ask for the next page
pub const CONTINUATION_PARAM: &str = "continuation_token";

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// IP list (`sec_policy/{version}/ip_lists`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpListRecord {
    /// Unique name; imports match on it
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ranges as `{from_ip, to_ip, exclusion}` objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_ranges: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdns: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Application (`applications`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Cloud inventory resource (`bridge/resources`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Resource object type (`inventory/metadata?metadata_type=OBJECTTYPE`).
///
/// Bare string entries arrive as `{"value": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectTypeRecord {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Service (`sec_policy/{version}/services`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Unique name; imports match on it
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ports: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Cloud flow type registered by an onboarding request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowType {
    #[serde(rename = "AzureFlow")]
    Azure,
    #[serde(rename = "AWSFlow")]
    Aws,
}

/// Body of `POST integrations/cloud_credentials`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudCredentialsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    pub destinations: Vec<String>,
}

/// Outcome of an onboarding request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardResult {
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    pub destinations: Vec<String>,
    /// Decoded response body; `null` when the API returned none
    pub response: Value,
}

/// Sort order for resource listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortBy {
    pub asc: bool,
    pub field: String,
}

impl Default for SortBy {
    fn default() -> Self {
        Self {
            asc: true,
            field: "STATE".to_string(),
        }
    }
}

/// Body of `POST bridge/resources`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceListRequest {
    pub max_results: u32,
    #[serde(rename = "sortBy")]
    pub sort_by: SortBy,
    pub clouds: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Outcome of importing one entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub name: String,
    pub status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Created,
    AlreadyExists,
    Skipped,
    Failed,
}

/// One decoded page of a list response.
///
/// A bare array is a single page. An object holding array fields is a
/// wrapper: one of the arrays holds the records, its field name becomes the
/// label, and a continuation key (see [`CONTINUATION_KEYS`]) points at the
/// next page. The record array is the named collection when present, else
/// the only array, else the only non-empty array. Side arrays such as an
/// empty `errors` list are dropped. Any other object is a single record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub label: Option<String>,
    pub items: Vec<Value>,
    pub continuation: Option<String>,
}

impl Page {
    pub fn from_value(value: Value) -> Self {
        Self::from_collection(value, None)
    }

    /// Decode a page whose records are expected under `collection`
    pub fn from_collection(value: Value, collection: Option<&str>) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::Array(items) => Self {
                items,
                ..Self::default()
            },
            Value::Object(mut map) => {
                let continuation = CONTINUATION_KEYS.iter().find_map(|key| {
                    map.get(*key)
                        .and_then(Value::as_str)
                        .filter(|token| !token.is_empty())
                        .map(str::to_string)
                });

                let arrays: Vec<(&String, bool)> = map
                    .iter()
                    .filter_map(|(k, v)| v.as_array().map(|a| (k, a.is_empty())))
                    .collect();
                if arrays.is_empty() {
                    if map.is_empty() {
                        return Self::default();
                    }
                    return Self {
                        label: None,
                        items: vec![Value::Object(map)],
                        continuation,
                    };
                }

                let named = collection
                    .filter(|name| map.get(*name).map_or(false, Value::is_array))
                    .map(str::to_string);
                let non_empty: Vec<&String> = arrays
                    .iter()
                    .filter(|(_, empty)| !empty)
                    .map(|(k, _)| *k)
                    .collect();
                let all_empty = non_empty.is_empty();
                let key = match (named, arrays.as_slice(), non_empty.as_slice()) {
                    (Some(name), _, _) => Some(name),
                    (None, [(only, _)], _) => Some((*only).clone()),
                    (None, _, [only]) => Some((*only).clone()),
                    _ => None,
                };

                match key {
                    Some(key) => {
                        let items = match map.remove(&key) {
                            Some(Value::Array(items)) => items,
                            _ => Vec::new(),
                        };
                        Self {
                            label: Some(key),
                            items,
                            continuation,
                        }
                    }
                    // several arrays, all empty: nothing to list
                    None if all_empty => Self {
                        continuation,
                        ..Self::default()
                    },
                    None => Self {
                        label: None,
                        items: vec![Value::Object(map)],
                        continuation,
                    },
                }
            }
            scalar => Self {
                items: vec![scalar],
                ..Self::default()
            },
        }
    }

    /// Decode the items as typed records. Scalars are wrapped as `{"value": ...}`.
    pub fn records<T>(&self) -> Result<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.items
            .iter()
            .map(|item| {
                let item = match item {
                    Value::Object(_) => item.clone(),
                    other => serde_json::json!({ "value": other }),
                };
                serde_json::from_value(item).map_err(|e| {
                    CloudSecureError::Serialization(format!("unexpected record shape: {}", e))
                })
            })
            .collect()
    }
}
