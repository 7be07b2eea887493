use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use cloudlog_core::ProviderError;
use cloudlog_core::model::entry::{EntriesRequest, Payload};
use cloudlog_provider::LogProvider;
use cloudlog_provider::api::ProjectLocator;
use cloudlog_provider::locator::MetadataProjectLocator;
use cloudlog_provider::rest::{Credentials, RestClient, RestEndpoints};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Mock {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Mock {
    fn record(&self, line: String) {
        self.seen.lock().unwrap().push(line);
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

fn auth(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

async fn entries(State(mock): State<Mock>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    mock.record(format!("entries {} {}", auth(&headers), body));
    Json(json!({
        "entries": [{
            "insertId": "e1",
            "timestamp": "2022-08-19T14:45:49.373Z",
            "severity": "ERROR",
            "textPayload": "boom"
        }],
        "nextPageToken": "tok-2"
    }))
}

async fn projects(State(mock): State<Mock>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let token = q.get("pageToken").cloned().unwrap_or_default();
    mock.record(format!("projects {token}"));
    if token.is_empty() {
        Json(json!({"projects": [{"projectId": "alpha"}], "nextPageToken": "p2"}))
    } else {
        Json(json!({"projects": [{"projectId": "beta"}]}))
    }
}

async fn buckets(Path(project): Path<String>) -> (StatusCode, Json<Value>) {
    if project == "locked" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"code": 403, "message": "no access"}})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"buckets": [
            {"name": format!("projects/{project}/locations/global/buckets/_Default")},
            {"name": format!("projects/{project}/locations/us/buckets/audit")}
        ]})),
    )
}

async fn views(Path((project, location, bucket)): Path<(String, String, String)>) -> Json<Value> {
    Json(json!({"views": [
        {"name": format!("projects/{project}/locations/{location}/buckets/{bucket}/views/_AllLogs")},
        {"name": format!("projects/{project}/locations/{location}/buckets/{bucket}/views/errors")}
    ]}))
}

async fn metadata_token(headers: HeaderMap, State(mock): State<Mock>) -> Result<Json<Value>, StatusCode> {
    if headers.get("metadata-flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
        return Err(StatusCode::FORBIDDEN);
    }
    mock.record("token".into());
    Ok(Json(json!({"access_token": "meta-token", "expires_in": 3600, "token_type": "Bearer"})))
}

async fn metadata_project(headers: HeaderMap) -> Result<&'static str, StatusCode> {
    if headers.get("metadata-flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok("meta-project\n")
}

async fn spawn_mock() -> (String, Mock) {
    let mock = Mock::default();
    let app = Router::new()
        .route("/v2/entries:list", post(entries))
        .route("/v1/projects", get(projects))
        .route("/v2/projects/{project}/locations/-/buckets", get(buckets))
        .route(
            "/v2/projects/{project}/locations/{location}/buckets/{bucket}/views",
            get(views),
        )
        .route(
            "/computeMetadata/v1/instance/service-accounts/default/token",
            get(metadata_token),
        )
        .route("/computeMetadata/v1/project/project-id", get(metadata_project))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), mock)
}

fn client(base: &str, credentials: Credentials) -> RestClient {
    RestClient::new(
        reqwest::Client::new(),
        RestEndpoints {
            logging: base.to_string(),
            resource_manager: base.to_string(),
            metadata: base.to_string(),
        },
        credentials,
    )
}

fn request() -> EntriesRequest {
    EntriesRequest {
        resource_names: vec!["projects/alpha".into()],
        filter: "severity>=ERROR".into(),
        order_by: "timestamp desc".into(),
        page_size: 10,
        page_token: None,
    }
}

#[tokio::test]
async fn lists_entries_with_bearer_token() -> anyhow::Result<()> {
    let (base, mock) = spawn_mock().await;
    let client = client(&base, Credentials::Token("secret".into()));

    let page = client.list_entries(&request()).await?;
    assert_eq!(page.next_page_token.as_deref(), Some("tok-2"));
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].payload, Some(Payload::Text("boom".into())));

    let seen = mock.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("entries Bearer secret "));
    assert!(seen[0].contains(r#""resourceNames":["projects/alpha"]"#));
    assert!(seen[0].contains(r#""pageSize":10"#));
    Ok(())
}

#[tokio::test]
async fn metadata_token_is_fetched_once_and_cached() -> anyhow::Result<()> {
    let (base, mock) = spawn_mock().await;
    let client = client(&base, Credentials::Metadata);

    client.list_entries(&request()).await?;
    client.list_entries(&request()).await?;

    let seen = mock.seen();
    assert_eq!(seen.iter().filter(|l| *l == "token").count(), 1);
    assert!(seen[1].starts_with("entries Bearer meta-token "));
    Ok(())
}

#[tokio::test]
async fn projects_follow_page_tokens() -> anyhow::Result<()> {
    let (base, mock) = spawn_mock().await;
    let client = client(&base, Credentials::Anonymous);

    assert_eq!(client.list_projects().await?, vec!["alpha", "beta"]);
    assert_eq!(mock.seen(), vec!["projects ", "projects p2"]);
    Ok(())
}

#[tokio::test]
async fn buckets_are_project_relative_and_views_are_bare_ids() -> anyhow::Result<()> {
    let (base, _mock) = spawn_mock().await;
    let client = client(&base, Credentials::Anonymous);

    let buckets = client.list_buckets("alpha").await?;
    assert_eq!(
        buckets,
        vec!["locations/global/buckets/_Default", "locations/us/buckets/audit"]
    );

    let views = client.list_views("alpha", &buckets[0]).await?;
    assert_eq!(views, vec!["_AllLogs", "errors"]);
    Ok(())
}

#[tokio::test]
async fn forbidden_maps_to_permission_denied() {
    let (base, _mock) = spawn_mock().await;
    let client = client(&base, Credentials::Anonymous);

    let err = client.list_buckets("locked").await.unwrap_err();
    assert_eq!(err, ProviderError::PermissionDenied("no access".into()));
}

#[tokio::test]
async fn closed_client_refuses_calls() -> anyhow::Result<()> {
    let (base, mock) = spawn_mock().await;
    let client = client(&base, Credentials::Anonymous);

    client.close().await?;
    let err = client.list_projects().await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
    assert!(mock.seen().is_empty());
    Ok(())
}

#[tokio::test]
async fn metadata_locator_reads_project_id() -> anyhow::Result<()> {
    let (base, _mock) = spawn_mock().await;
    let locator = MetadataProjectLocator::new(reqwest::Client::new(), format!("{base}/"));
    assert_eq!(locator.default_project().await?, "meta-project");
    Ok(())
}
