use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cloudlog_core::ProviderError;
use cloudlog_core::config::{AuthType, Config};
use cloudlog_core::model::entry::{EntriesPage, EntriesRequest};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::LogProvider;
use crate::rest::decode::{ListEntriesResponse, decode_page};

pub const METADATA_FLAVOR: &str = "Google";

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestEndpoints {
    pub logging: String,
    pub resource_manager: String,
    pub metadata: String,
}

impl RestEndpoints {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            logging: trim_base(&cfg.logging_endpoint),
            resource_manager: trim_base(&cfg.resource_manager_endpoint),
            metadata: trim_base(&cfg.metadata_endpoint),
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// How requests are authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-issued bearer token.
    Token(String),
    /// Service account token fetched from the metadata server.
    Metadata,
    Anonymous,
}

impl Credentials {
    pub fn from_config(cfg: &Config) -> Self {
        match (cfg.auth_type, cfg.access_token.as_deref()) {
            (AuthType::Gce, _) => Self::Metadata,
            (AuthType::Token, Some(token)) if !token.is_empty() => Self::Token(token.to_string()),
            (AuthType::Token, _) => Self::Anonymous,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListProjectsResponse {
    #[serde(default)]
    projects: Vec<ProjectEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectEntry {
    project_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBucketsResponse {
    #[serde(default)]
    buckets: Vec<NamedResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListViewsResponse {
    #[serde(default)]
    views: Vec<NamedResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

/// Cloud Logging client over the public REST API.
pub struct RestClient {
    http: reqwest::Client,
    endpoints: RestEndpoints,
    credentials: Credentials,
    token: Mutex<Option<CachedToken>>,
    closed: AtomicBool,
}

impl RestClient {
    pub fn new(http: reqwest::Client, endpoints: RestEndpoints, credentials: Credentials) -> Self {
        Self {
            http,
            endpoints,
            credentials,
            token: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self::new(
            http,
            RestEndpoints::from_config(cfg),
            Credentials::from_config(cfg),
        ))
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn endpoints(&self) -> &RestEndpoints {
        &self.endpoints
    }

    fn ensure_open(&self) -> Result<(), ProviderError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProviderError::Transport("client is closed".into()));
        }
        Ok(())
    }

    async fn bearer(&self) -> Result<Option<String>, ProviderError> {
        match &self.credentials {
            Credentials::Token(token) => Ok(Some(token.clone())),
            Credentials::Anonymous => Ok(None),
            Credentials::Metadata => {
                let mut cached = self.token.lock().await;
                if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
                    return Ok(Some(token.value.clone()));
                }
                let fresh = self.fetch_metadata_token().await?;
                let value = fresh.value.clone();
                *cached = Some(fresh);
                Ok(Some(value))
            }
        }
    }

    async fn fetch_metadata_token(&self) -> Result<CachedToken, ProviderError> {
        let url = format!("{}{TOKEN_PATH}", self.endpoints.metadata);
        debug!(%url, "fetching access token from metadata server");
        let resp = self
            .http
            .get(&url)
            .header("Metadata-Flavor", METADATA_FLAVOR)
            .send()
            .await
            .map_err(transport)?;
        let token: MetadataToken = read_json(resp).await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ProviderError> {
        self.ensure_open()?;
        let req = match self.bearer().await? {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = req.send().await.map_err(transport)?;
        read_json(resp).await
    }

    async fn list_bucket_page(
        &self,
        project_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListBucketsResponse, ProviderError> {
        let url = format!(
            "{}/v2/projects/{project_id}/locations/-/buckets",
            self.endpoints.logging
        );
        self.send(with_page_token(self.http.get(url), page_token)).await
    }

    async fn list_view_page(
        &self,
        project_id: &str,
        bucket_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListViewsResponse, ProviderError> {
        let url = format!(
            "{}/v2/projects/{project_id}/{bucket_id}/views",
            self.endpoints.logging
        );
        self.send(with_page_token(self.http.get(url), page_token)).await
    }
}

#[async_trait]
impl LogProvider for RestClient {
    async fn list_entries(&self, request: &EntriesRequest) -> Result<EntriesPage, ProviderError> {
        let url = format!("{}/v2/entries:list", self.endpoints.logging);
        let resp: ListEntriesResponse = self.send(self.http.post(url).json(request)).await?;
        Ok(decode_page(resp))
    }

    async fn list_projects(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/v1/projects", self.endpoints.resource_manager);
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let resp: ListProjectsResponse = self
                .send(with_page_token(self.http.get(&url), page_token.as_deref()))
                .await?;
            out.extend(resp.projects.into_iter().map(|p| p.project_id));
            match resp.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => return Ok(out),
            }
        }
    }

    async fn list_buckets(&self, project_id: &str) -> Result<Vec<String>, ProviderError> {
        let prefix = format!("projects/{project_id}/");
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let resp = self
                .list_bucket_page(project_id, page_token.as_deref())
                .await?;
            out.extend(resp.buckets.into_iter().map(|b| match b.name.strip_prefix(&prefix) {
                Some(rest) => rest.to_string(),
                None => b.name,
            }));
            match resp.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => return Ok(out),
            }
        }
    }

    async fn list_views(
        &self,
        project_id: &str,
        bucket_id: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let resp = self
                .list_view_page(project_id, bucket_id, page_token.as_deref())
                .await?;
            out.extend(
                resp.views
                    .iter()
                    .filter_map(|v| v.name.rsplit('/').next())
                    .map(str::to_string),
            );
            match resp.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => return Ok(out),
            }
        }
    }

    async fn close(&self) -> Result<(), ProviderError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

fn with_page_token(req: RequestBuilder, page_token: Option<&str>) -> RequestBuilder {
    match page_token {
        Some(token) => req.query(&[("pageToken", token)]),
        None => req,
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ProviderError> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(transport)?;
    if !status.is_success() {
        let message = error_message(&body);
        return Err(match status {
            StatusCode::UNAUTHORIZED => ProviderError::Unauthenticated(message),
            StatusCode::FORBIDDEN => ProviderError::PermissionDenied(message),
            _ => ProviderError::Status {
                status: status.as_u16(),
                message,
            },
        });
    }
    serde_json::from_slice(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Pulls `error.message` out of a Google API error body, else the raw text.
fn error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Inner,
    }
    #[derive(Deserialize)]
    struct Inner {
        message: String,
    }

    match serde_json::from_slice::<Envelope>(body) {
        Ok(env) => env.error.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}
