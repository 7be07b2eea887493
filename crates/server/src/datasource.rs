use std::sync::Arc;

use axum::http::StatusCode;
use cloudlog_core::error::{CloudlogError, Result};
use cloudlog_core::frame::frames_from_records;
use cloudlog_core::query::{DataQuery, DataResponse, QueryDataRequest, QueryDataResponse, QueryModel, compile};
use cloudlog_provider::discovery::{self, BUCKET_ID_PARAM, PROJECT_ID_PARAM};
use cloudlog_provider::{LogFetcher, LogProvider, ProjectLocator, RequestContext};
use tracing::{debug, warn};

use crate::resources::{ResourceRequest, ResourceResponse, ResourceRoute};

/// Query and resource handlers over an injected provider client.
///
/// The provider is owned by whoever built the datasource; nothing here closes it.
#[derive(Clone)]
pub struct Datasource {
    provider: Arc<dyn LogProvider>,
    locator: Arc<dyn ProjectLocator>,
    fetcher: LogFetcher,
}

impl Datasource {
    pub fn new(
        provider: Arc<dyn LogProvider>,
        locator: Arc<dyn ProjectLocator>,
        fetcher: LogFetcher,
    ) -> Self {
        Self {
            provider,
            locator,
            fetcher,
        }
    }

    /// Runs every query in the batch. A failing query only affects its own entry.
    pub async fn query_data(&self, ctx: &RequestContext, req: &QueryDataRequest) -> QueryDataResponse {
        let mut resp = QueryDataResponse::default();
        for query in &req.queries {
            let result = self.query(ctx, query).await;
            resp.results.insert(query.ref_id.clone(), result);
        }
        resp
    }

    async fn query(&self, ctx: &RequestContext, query: &DataQuery) -> DataResponse {
        let parsed = QueryModel::from_json(&query.json)
            .and_then(|model| Ok((model, query.time_range()?)));
        let (model, time_range) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(ref_id = %query.ref_id, error = %err, "rejecting query");
                return DataResponse::error(err.to_string());
            }
        };

        let compiled = compile(&model, &time_range, query.max_data_points);
        match self.fetcher.fetch(self.provider.as_ref(), ctx, &compiled).await {
            Ok(records) => {
                let frames = frames_from_records(&records);
                debug!(
                    ref_id = %query.ref_id,
                    records = records.len(),
                    frames = frames.len(),
                    "query complete"
                );
                DataResponse::frames(frames)
            }
            Err(err) => {
                warn!(ref_id = %query.ref_id, error = %err, "query failed");
                DataResponse::error(format!("query: {err}"))
            }
        }
    }

    pub async fn call_resource(&self, ctx: &RequestContext, req: &ResourceRequest) -> ResourceResponse {
        let Some(route) = ResourceRoute::from_path(&req.path) else {
            debug!(path = %req.path, "unknown resource path");
            return ResourceResponse::not_found();
        };
        if let Some(name) = req.missing_param(route) {
            return ResourceResponse::missing_param(name);
        }

        if route == ResourceRoute::DefaultProject {
            let project = match self.locator.default_project().await {
                Ok(project) => project,
                Err(err) => {
                    warn!(error = %err, "problem getting default project");
                    String::new()
                }
            };
            return encode(&project);
        }

        match self.list(ctx, route, req).await {
            Ok(list) => encode(&list),
            Err(CloudlogError::MissingParameter(name)) => ResourceResponse::missing_param(&name),
            Err(err) => {
                warn!(path = %req.path, error = %err, "resource listing failed");
                ResourceResponse::bad_gateway(route)
            }
        }
    }

    async fn list(&self, ctx: &RequestContext, route: ResourceRoute, req: &ResourceRequest) -> Result<Vec<String>> {
        let provider = self.provider.as_ref();
        match route {
            ResourceRoute::Projects => discovery::list_projects(provider, ctx).await,
            ResourceRoute::LogBuckets => {
                discovery::list_buckets(provider, ctx, req.param(PROJECT_ID_PARAM)).await
            }
            ResourceRoute::LogViews => {
                discovery::list_views(
                    provider,
                    ctx,
                    req.param(PROJECT_ID_PARAM),
                    req.param(BUCKET_ID_PARAM),
                )
                .await
            }
            ResourceRoute::DefaultProject => Err(CloudlogError::Internal(
                "default project is not a listing".into(),
            )),
        }
    }
}

fn encode<T: serde::Serialize + ?Sized>(value: &T) -> ResourceResponse {
    match to_json(value) {
        Ok(body) => ResourceResponse::json(StatusCode::OK, body),
        Err(err) => {
            warn!(error = %err, "unable to create resource response");
            ResourceResponse::encoding_failure()
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| CloudlogError::Encoding(e.to_string()))
}
