//! Output frames in the data-frame JSON form consumed by the rendering layer.
//!
//! Every log entry becomes its own frame with exactly two single-value
//! fields: `time` and `content`. Labels ride on the `content` field as
//! metadata instead of widening the table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisType {
    Logs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Time(Vec<DateTime<Utc>>),
    String(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub values: FieldValues,
}

impl Field {
    pub fn time(name: impl Into<String>, values: Vec<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            values: FieldValues::Time(values),
        }
    }

    pub fn string(
        name: impl Into<String>,
        labels: BTreeMap<String, String>,
        values: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            labels,
            values: FieldValues::String(values),
        }
    }

    pub fn len(&self) -> usize {
        match &self.values {
            FieldValues::Time(v) => v.len(),
            FieldValues::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
    pub preferred_visualization: Option<VisType>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            preferred_visualization: None,
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_visualization(mut self, vis: VisType) -> Self {
        self.preferred_visualization = Some(vis);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Serialize)]
struct WireFrame<'a> {
    schema: WireSchema<'a>,
    data: WireData,
}

#[derive(Serialize)]
struct WireSchema<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<WireMeta>,
    fields: Vec<WireField<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireMeta {
    type_version: [u32; 2],
    preferred_visualisation_type: VisType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireField<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    type_info: WireTypeInfo,
    #[serde(skip_serializing_if = "no_labels")]
    labels: &'a BTreeMap<String, String>,
}

fn no_labels(labels: &&BTreeMap<String, String>) -> bool {
    labels.is_empty()
}

#[derive(Serialize)]
struct WireTypeInfo {
    frame: &'static str,
}

#[derive(Serialize)]
struct WireData {
    values: Vec<Vec<serde_json::Value>>,
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self
            .fields
            .iter()
            .map(|f| {
                let (kind, frame) = match f.values {
                    FieldValues::Time(_) => ("time", "time.Time"),
                    FieldValues::String(_) => ("string", "string"),
                };
                WireField {
                    name: &f.name,
                    kind,
                    type_info: WireTypeInfo { frame },
                    labels: &f.labels,
                }
            })
            .collect();

        let values = self
            .fields
            .iter()
            .map(|f| match &f.values {
                FieldValues::Time(v) => v
                    .iter()
                    .map(|ts| serde_json::Value::from(ts.timestamp_millis()))
                    .collect(),
                FieldValues::String(v) => v.iter().cloned().map(serde_json::Value::from).collect(),
            })
            .collect();

        WireFrame {
            schema: WireSchema {
                name: &self.name,
                meta: self.preferred_visualization.map(|vis| WireMeta {
                    type_version: [0, 0],
                    preferred_visualisation_type: vis,
                }),
                fields,
            },
            data: WireData { values },
        }
        .serialize(serializer)
    }
}
