use std::collections::HashMap;

use axum::http::StatusCode;
use cloudlog_provider::discovery::{BUCKET_ID_PARAM, PROJECT_ID_PARAM};

pub const NOT_FOUND_BODY: &str = "No such path";
pub const ENCODING_FAILURE_BODY: &str = "Unable to create response";

const DEFAULT_PROJECT_ALIAS: &str = "gceDefaultProject";

/// Every resource path the router answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRoute {
    Projects,
    DefaultProject,
    LogBuckets,
    LogViews,
}

impl ResourceRoute {
    pub fn from_path(path: &str) -> Option<Self> {
        if path == DEFAULT_PROJECT_ALIAS {
            return Some(Self::DefaultProject);
        }
        if path.eq_ignore_ascii_case("projects") {
            return Some(Self::Projects);
        }
        match path {
            "logbuckets" => Some(Self::LogBuckets),
            "logviews" => Some(Self::LogViews),
            _ => None,
        }
    }

    /// Query parameters that must be present and non-empty.
    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            Self::Projects | Self::DefaultProject => &[],
            Self::LogBuckets => &[PROJECT_ID_PARAM],
            Self::LogViews => &[PROJECT_ID_PARAM, BUCKET_ID_PARAM],
        }
    }

    /// Body returned with 502 when the provider call behind this route fails.
    pub fn failure_body(self) -> &'static str {
        match self {
            Self::Projects | Self::DefaultProject => {
                r#"{"error": "Failed to list projects. Please check your permissions and authentication configuration."}"#
            }
            Self::LogBuckets => {
                r#"{"error": "Failed to list log buckets. Please check your project ID and permissions."}"#
            }
            Self::LogViews => {
                r#"{"error": "Failed to list log views. Please check your bucket ID and permissions."}"#
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRequest {
    pub path: String,
    pub params: HashMap<String, String>,
}

impl ResourceRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or_default()
    }

    /// First required parameter that is absent or blank.
    pub fn missing_param(&self, route: ResourceRoute) -> Option<&'static str> {
        route
            .required_params()
            .iter()
            .copied()
            .find(|name| self.param(name).trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl ResourceResponse {
    pub fn json(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.into(),
        }
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
    }

    pub fn encoding_failure() -> Self {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, ENCODING_FAILURE_BODY)
    }

    pub fn missing_param(name: &str) -> Self {
        let body = serde_json::json!({ "error": format!("missing required parameter: {name}") });
        Self::json(StatusCode::BAD_REQUEST, body.to_string())
    }

    pub fn bad_gateway(route: ResourceRoute) -> Self {
        Self::json(StatusCode::BAD_GATEWAY, route.failure_body())
    }
}
