use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{Method, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cloudlog_core::query::{QueryDataRequest, QueryDataResponse};
use cloudlog_provider::RequestContext;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::datasource::Datasource;
use crate::resources::{ResourceRequest, ResourceResponse};

#[derive(Clone)]
pub struct HttpState {
    pub datasource: Datasource,
    pub request_timeout: Duration,
}

impl HttpState {
    fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}

pub fn router(datasource: Datasource, request_timeout: Duration) -> Router {
    let state = HttpState {
        datasource,
        request_timeout,
    };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route("/query", post(query))
        .route("/resources/{*path}", get(resource))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn query(
    State(state): State<HttpState>,
    Json(req): Json<QueryDataRequest>,
) -> Json<QueryDataResponse> {
    let ctx = state.context();
    tracing::debug!(queries = req.queries.len(), "query batch received");
    Json(state.datasource.query_data(&ctx, &req).await)
}

async fn resource(
    State(state): State<HttpState>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ResourceResponse {
    let ctx = state.context();
    let req = ResourceRequest { path, params };
    state.datasource.call_resource(&ctx, &req).await
}

impl IntoResponse for ResourceResponse {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}
