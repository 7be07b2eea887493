use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// A log entry as returned by the provider, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLogRecord {
    pub insert_id: String,
    pub log_name: String,
    pub timestamp: DateTime<Utc>,
    pub receive_timestamp: Option<DateTime<Utc>>,
    pub severity: Severity,
    pub resource: Option<MonitoredResource>,
    pub labels: BTreeMap<String, String>,
    pub trace: String,
    pub span_id: String,
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Text(String),
    Structured(serde_json::Map<String, serde_json::Value>),
    Proto(ProtoPayload),
}

/// A serialized protobuf message packed as `google.protobuf.Any`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoPayload {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl ProtoPayload {
    /// Fully-qualified message name, e.g. `google.protobuf.Struct`.
    pub fn type_name(&self) -> &str {
        self.type_url.rsplit('/').next().unwrap_or(&self.type_url)
    }
}

/// One page of entries returned by a provider list call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntriesPage {
    pub entries: Vec<RawLogRecord>,
    pub next_page_token: Option<String>,
}

/// Provider-facing list request for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntriesRequest {
    pub resource_names: Vec<String>,
    pub filter: String,
    pub order_by: String,
    pub page_size: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}
