use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CloudlogError, Result};
use crate::model::entry::EntriesRequest;
use crate::model::frame::Frame;
use crate::time::render_timestamp;

pub const ORDER_BY: &str = "timestamp desc";
pub const DEFAULT_VIEW: &str = "_AllLogs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Query fields authored in the visualization tool's query editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryModel {
    #[serde(default)]
    pub query_text: String,
    pub project_id: String,
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub view_id: Option<String>,
}

impl QueryModel {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let model: Self = serde_json::from_value(value.clone())
            .map_err(|e| CloudlogError::ClientInput(format!("malformed query model: {e}")))?;
        if model.project_id.trim().is_empty() {
            return Err(CloudlogError::ClientInput("projectId is required".into()));
        }
        Ok(model)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    #[serde(default)]
    pub ref_id: String,
    #[serde(default)]
    pub max_data_points: i64,
    /// Kept raw so one bad window only fails its own query.
    #[serde(default)]
    pub time_range: serde_json::Value,
    #[serde(default)]
    pub json: serde_json::Value,
}

impl DataQuery {
    pub fn new(ref_id: impl Into<String>, time_range: TimeRange, json: serde_json::Value) -> Self {
        Self {
            ref_id: ref_id.into(),
            max_data_points: 0,
            time_range: serde_json::json!({
                "from": time_range.from,
                "to": time_range.to,
            }),
            json,
        }
    }

    pub fn with_max_data_points(mut self, max_data_points: i64) -> Self {
        self.max_data_points = max_data_points;
        self
    }

    pub fn time_range(&self) -> Result<TimeRange> {
        TimeRange::deserialize(&self.time_range)
            .map_err(|e| CloudlogError::ClientInput(format!("malformed time range: {e}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDataRequest {
    #[serde(default)]
    pub queries: Vec<DataQuery>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub frames: Vec<Frame>,
}

impl DataResponse {
    pub fn frames(frames: Vec<Frame>) -> Self {
        Self {
            error: None,
            frames,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            frames: Vec::new(),
        }
    }
}

/// Responses keyed by each query's `refId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryDataResponse {
    pub results: BTreeMap<String, DataResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTimeRange {
    pub from: String,
    pub to: String,
}

/// Provider request parameters compiled from one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogQuery {
    pub project_id: String,
    pub resource_name: String,
    pub filter: String,
    pub time_range: RenderedTimeRange,
    pub limit: i64,
}

impl LogQuery {
    /// Filter sent on the wire: the user clause plus the time window.
    pub fn provider_filter(&self) -> String {
        let window = format!(
            "timestamp>=\"{}\" AND timestamp<=\"{}\"",
            self.time_range.from, self.time_range.to
        );
        let user = self.filter.trim();
        if user.is_empty() {
            window
        } else {
            format!("({user}) AND {window}")
        }
    }

    pub fn entries_request(&self, page_size: i32, page_token: Option<String>) -> EntriesRequest {
        EntriesRequest {
            resource_names: vec![self.resource_name.clone()],
            filter: self.provider_filter(),
            order_by: ORDER_BY.to_string(),
            page_size,
            page_token,
        }
    }
}

/// Compiles a query into provider request parameters.
///
/// The limit is passed through untouched; non-positive values are resolved by
/// the fetcher. The filter is not validated here.
pub fn compile(model: &QueryModel, time_range: &TimeRange, limit: i64) -> LogQuery {
    LogQuery {
        project_id: model.project_id.clone(),
        resource_name: resource_name(model),
        filter: model.query_text.clone(),
        time_range: RenderedTimeRange {
            from: render_timestamp(&time_range.from),
            to: render_timestamp(&time_range.to),
        },
        limit,
    }
}

fn resource_name(model: &QueryModel) -> String {
    let project = format!("projects/{}", model.project_id);
    match non_empty(model.bucket_id.as_deref()) {
        Some(bucket) => {
            let view = non_empty(model.view_id.as_deref()).unwrap_or(DEFAULT_VIEW);
            format!("{project}/{}/views/{view}", bucket.trim_matches('/'))
        }
        None => project,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
