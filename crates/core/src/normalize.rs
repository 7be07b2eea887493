//! Collapses provider log entries into a display body plus a flat label set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use prost::Message;
use prost_types::value::Kind;

use crate::error::{CloudlogError, Result};
use crate::ids::trace_id_from_reference;
use crate::model::entry::{Payload, ProtoPayload, RawLogRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub body: String,
    pub labels: BTreeMap<String, String>,
}

pub fn normalize(record: &RawLogRecord) -> Result<NormalizedRecord> {
    let body = payload_body(record.payload.as_ref())?;
    Ok(NormalizedRecord {
        id: record.insert_id.clone(),
        timestamp: record.timestamp,
        body,
        labels: record_labels(record),
    })
}

pub fn payload_body(payload: Option<&Payload>) -> Result<String> {
    match payload {
        Some(Payload::Text(text)) => Ok(text.clone()),
        Some(Payload::Structured(fields)) => structured_body(fields),
        Some(Payload::Proto(proto)) => proto_body(proto),
        None => Err(CloudlogError::Decode("log entry has no payload".into())),
    }
}

pub fn record_labels(record: &RawLogRecord) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("id".to_string(), record.insert_id.clone());
    labels.insert("level".to_string(), record.severity.level());

    if let Some(resource) = &record.resource {
        labels.insert("resource.type".to_string(), resource.kind.clone());
        for (k, v) in &resource.labels {
            labels.insert(label_key(k), v.clone());
        }
    }
    for (k, v) in &record.labels {
        labels.insert(label_key(k), v.clone());
    }

    if let Some(Payload::Text(text)) = &record.payload {
        labels.insert("textPayload".to_string(), text.clone());
    }

    if !record.trace.is_empty() {
        labels.insert("trace".to_string(), record.trace.clone());
        if let Some(trace_id) = trace_id_from_reference(&record.trace) {
            labels.insert("traceId".to_string(), trace_id.to_string());
        }
    }

    labels
}

/// `labels."<key>"`, keeping user keys out of the reserved namespaces.
pub fn label_key(key: &str) -> String {
    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
    format!("labels.\"{escaped}\"")
}

fn structured_body(fields: &serde_json::Map<String, serde_json::Value>) -> Result<String> {
    serde_json::to_string(fields)
        .map_err(|e| CloudlogError::Decode(format!("failed to render structured payload: {e}")))
}

fn proto_body(proto: &ProtoPayload) -> Result<String> {
    let value = decode_well_known(proto)?;
    let wrapped = serde_json::json!({
        "@type": proto.type_url,
        "value": value,
    });
    serde_json::to_string(&wrapped)
        .map_err(|e| CloudlogError::Decode(format!("failed to render proto payload: {e}")))
}

fn decode_well_known(proto: &ProtoPayload) -> Result<serde_json::Value> {
    let bytes = proto.value.as_slice();
    let decode_err =
        |e: prost::DecodeError| CloudlogError::Decode(format!("{}: {e}", proto.type_name()));

    match proto.type_name() {
        "google.protobuf.Struct" => {
            struct_to_json(prost_types::Struct::decode(bytes).map_err(decode_err)?)
        }
        "google.protobuf.Value" => {
            value_to_json(prost_types::Value::decode(bytes).map_err(decode_err)?)
        }
        "google.protobuf.ListValue" => {
            list_to_json(prost_types::ListValue::decode(bytes).map_err(decode_err)?)
        }
        other => Err(CloudlogError::Decode(format!(
            "unsupported proto payload type {other}"
        ))),
    }
}

fn struct_to_json(s: prost_types::Struct) -> Result<serde_json::Value> {
    let mut map = serde_json::Map::new();
    for (k, v) in s.fields {
        map.insert(k, value_to_json(v)?);
    }
    Ok(serde_json::Value::Object(map))
}

fn list_to_json(list: prost_types::ListValue) -> Result<serde_json::Value> {
    list.values
        .into_iter()
        .map(value_to_json)
        .collect::<Result<Vec<_>>>()
        .map(serde_json::Value::Array)
}

fn value_to_json(value: prost_types::Value) -> Result<serde_json::Value> {
    Ok(match value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::NumberValue(n)) => serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| CloudlogError::Decode(format!("non-finite number {n}")))?,
        Some(Kind::StructValue(s)) => struct_to_json(s)?,
        Some(Kind::ListValue(l)) => list_to_json(l)?,
    })
}
