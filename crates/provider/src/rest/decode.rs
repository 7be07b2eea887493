use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cloudlog_core::ProviderError;
use cloudlog_core::model::entry::{EntriesPage, MonitoredResource, Payload, RawLogRecord};
use cloudlog_core::severity::Severity;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesResponse {
    #[serde(default)]
    pub entries: Vec<WireEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEntry {
    #[serde(default)]
    pub insert_id: String,
    #[serde(default)]
    pub log_name: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub receive_timestamp: Option<DateTime<Utc>>,
    pub severity: Option<String>,
    pub resource: Option<WireResource>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub trace: String,
    #[serde(default)]
    pub span_id: String,
    pub text_payload: Option<String>,
    pub json_payload: Option<serde_json::Map<String, serde_json::Value>>,
    pub proto_payload: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireResource {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

pub fn decode_page(resp: ListEntriesResponse) -> EntriesPage {
    let entries = resp
        .entries
        .into_iter()
        .filter_map(|entry| {
            let insert_id = entry.insert_id.clone();
            decode_entry(entry)
                .inspect_err(|err| warn!(%insert_id, error = %err, "dropping undecodable entry"))
                .ok()
        })
        .collect();

    EntriesPage {
        entries,
        next_page_token: resp.next_page_token.filter(|t| !t.is_empty()),
    }
}

pub fn decode_entry(entry: WireEntry) -> Result<RawLogRecord, ProviderError> {
    let timestamp = entry
        .timestamp
        .ok_or_else(|| ProviderError::Malformed("entry has no timestamp".into()))?;

    let severity = match entry.severity.as_deref() {
        None | Some("") => Severity::Default,
        Some(s) => s
            .parse()
            .map_err(|e: cloudlog_core::CloudlogError| ProviderError::Malformed(e.to_string()))?,
    };

    // The REST surface already renders proto payloads as JSON.
    let payload = match (entry.text_payload, entry.json_payload, entry.proto_payload) {
        (Some(text), _, _) => Some(Payload::Text(text)),
        (None, Some(json), _) => Some(Payload::Structured(json)),
        (None, None, Some(proto)) => Some(Payload::Structured(proto)),
        (None, None, None) => None,
    };

    Ok(RawLogRecord {
        insert_id: entry.insert_id,
        log_name: entry.log_name,
        timestamp,
        receive_timestamp: entry.receive_timestamp,
        severity,
        resource: entry.resource.map(|r| MonitoredResource {
            kind: r.kind,
            labels: r.labels,
        }),
        labels: entry.labels,
        trace: entry.trace,
        span_id: entry.span_id,
        payload,
    })
}
