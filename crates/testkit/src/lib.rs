use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cloudlog_core::ProviderError;
use cloudlog_core::model::entry::{
    EntriesPage, EntriesRequest, MonitoredResource, Payload, RawLogRecord,
};
use cloudlog_core::severity::Severity;
use cloudlog_provider::{LogProvider, ProjectLocator};

pub const SAMPLE_INSERT_ID: &str = "b6f39be2-b298-44da-9001-1f04e5756fa0";
pub const SAMPLE_TRACE: &str = "projects/xxx/traces/c0e331eab1515bbcd1b8306029902ff7";
pub const SAMPLE_TEXT: &str = "Full log message from this GCE instance";

/// The GCE instance text entry used across the query pipeline tests.
pub fn sample_entry() -> RawLogRecord {
    let ts = Utc
        .timestamp_millis_opt(1_660_920_349_373)
        .single()
        .expect("valid timestamp");
    RawLogRecord {
        insert_id: SAMPLE_INSERT_ID.to_string(),
        log_name: "projects/testing/logs/syslog".to_string(),
        timestamp: ts,
        receive_timestamp: Some(ts),
        severity: Severity::Info,
        resource: Some(MonitoredResource {
            kind: "gce_instance".to_string(),
            labels: BTreeMap::from([("instance_id".to_string(), "unique".to_string())]),
        }),
        labels: BTreeMap::from([("custom_label".to_string(), "custom_value".to_string())]),
        trace: SAMPLE_TRACE.to_string(),
        span_id: String::new(),
        payload: Some(Payload::Text(SAMPLE_TEXT.to_string())),
    }
}

/// A minimal text entry with the given id.
pub fn text_entry(insert_id: &str, body: &str) -> RawLogRecord {
    RawLogRecord {
        insert_id: insert_id.to_string(),
        resource: None,
        labels: BTreeMap::new(),
        trace: String::new(),
        payload: Some(Payload::Text(body.to_string())),
        ..sample_entry()
    }
}

/// Provider call as seen by [`FakeProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListEntries(EntriesRequest),
    ListProjects,
    ListBuckets(String),
    ListViews(String, String),
    Close,
}

/// Deterministic provider double with canned responses.
///
/// Entry pages are served in order; once they run out an empty final page is
/// returned. Listing calls answer from the configured lists unless an error
/// has been injected.
#[derive(Default)]
pub struct FakeProvider {
    pages: Mutex<VecDeque<Result<EntriesPage, ProviderError>>>,
    projects: Vec<String>,
    buckets: Vec<String>,
    views: Vec<String>,
    listing_error: Option<ProviderError>,
    calls: Mutex<Vec<Call>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `entries` as a single final page.
    pub fn with_entries(self, entries: Vec<RawLogRecord>) -> Self {
        self.with_page(entries, None)
    }

    pub fn with_page(self, entries: Vec<RawLogRecord>, next_page_token: Option<&str>) -> Self {
        self.push(Ok(EntriesPage {
            entries,
            next_page_token: next_page_token.map(str::to_string),
        }))
    }

    pub fn with_entries_error(self, err: ProviderError) -> Self {
        self.push(Err(err))
    }

    pub fn with_projects(mut self, projects: &[&str]) -> Self {
        self.projects = projects.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_buckets(mut self, buckets: &[&str]) -> Self {
        self.buckets = buckets.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_views(mut self, views: &[&str]) -> Self {
        self.views = views.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Makes every listing call fail with `err`.
    pub fn with_listing_error(mut self, err: ProviderError) -> Self {
        self.listing_error = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn push(self, page: Result<EntriesPage, ProviderError>) -> Self {
        self.pages.lock().expect("pages lock").push_back(page);
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn listing(&self, list: &[String]) -> Result<Vec<String>, ProviderError> {
        match &self.listing_error {
            Some(err) => Err(err.clone()),
            None => Ok(list.to_vec()),
        }
    }
}

#[async_trait]
impl LogProvider for FakeProvider {
    async fn list_entries(&self, request: &EntriesRequest) -> Result<EntriesPage, ProviderError> {
        self.record(Call::ListEntries(request.clone()));
        self.pages
            .lock()
            .expect("pages lock")
            .pop_front()
            .unwrap_or_else(|| Ok(EntriesPage::default()))
    }

    async fn list_projects(&self) -> Result<Vec<String>, ProviderError> {
        self.record(Call::ListProjects);
        self.listing(&self.projects)
    }

    async fn list_buckets(&self, project_id: &str) -> Result<Vec<String>, ProviderError> {
        self.record(Call::ListBuckets(project_id.to_string()));
        self.listing(&self.buckets)
    }

    async fn list_views(
        &self,
        project_id: &str,
        bucket_id: &str,
    ) -> Result<Vec<String>, ProviderError> {
        self.record(Call::ListViews(project_id.to_string(), bucket_id.to_string()));
        self.listing(&self.views)
    }

    async fn close(&self) -> Result<(), ProviderError> {
        self.record(Call::Close);
        Ok(())
    }
}

/// Project locator with a fixed answer.
pub struct FakeLocator(pub Result<String, ProviderError>);

impl FakeLocator {
    pub fn project(project_id: &str) -> Self {
        Self(Ok(project_id.to_string()))
    }

    pub fn failing() -> Self {
        Self(Err(ProviderError::Transport("metadata server unreachable".into())))
    }
}

#[async_trait]
impl ProjectLocator for FakeLocator {
    async fn default_project(&self) -> Result<String, ProviderError> {
        self.0.clone()
    }
}
