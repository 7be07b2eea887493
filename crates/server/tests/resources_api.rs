use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use cloudlog_core::ProviderError;
use cloudlog_provider::{LogFetcher, RequestContext};
use cloudlog_server::{Datasource, ResourceRequest, http};
use testkit::{Call, FakeLocator, FakeProvider, sample_entry};
use tower::ServiceExt;

fn datasource_with(provider: FakeProvider, locator: FakeLocator) -> (Datasource, Arc<FakeProvider>) {
    let provider = Arc::new(provider);
    let ds = Datasource::new(provider.clone(), Arc::new(locator), LogFetcher::default());
    (ds, provider)
}

fn listing_provider() -> FakeProvider {
    FakeProvider::new()
        .with_projects(&["zeta", "alpha"])
        .with_buckets(&["locations/global/buckets/_Default"])
        .with_views(&["_AllLogs", "errors"])
}

fn failing_provider() -> FakeProvider {
    FakeProvider::new().with_listing_error(ProviderError::PermissionDenied("nope".into()))
}

#[tokio::test]
async fn listings_are_encoded_as_json_arrays() {
    let (ds, provider) = datasource_with(listing_provider(), FakeLocator::project("p"));
    let ctx = RequestContext::new();

    let resp = ds.call_resource(&ctx, &ResourceRequest::new("projects")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, r#"["zeta","alpha"]"#);

    let resp = ds
        .call_resource(&ctx, &ResourceRequest::new("logbuckets").with_param("ProjectId", "p1"))
        .await;
    assert_eq!(resp.body, r#"["locations/global/buckets/_Default"]"#);

    let resp = ds
        .call_resource(
            &ctx,
            &ResourceRequest::new("logviews")
                .with_param("ProjectId", "p1")
                .with_param("BucketId", "locations/global/buckets/_Default"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, r#"["_AllLogs","errors"]"#);

    assert_eq!(
        provider.calls(),
        vec![
            Call::ListProjects,
            Call::ListBuckets("p1".into()),
            Call::ListViews("p1".into(), "locations/global/buckets/_Default".into()),
        ]
    );
}

#[tokio::test]
async fn provider_failures_return_fixed_bodies() {
    let (ds, _provider) = datasource_with(failing_provider(), FakeLocator::project("p"));
    let ctx = RequestContext::new();

    let cases = [
        (
            ResourceRequest::new("projects"),
            r#"{"error": "Failed to list projects. Please check your permissions and authentication configuration."}"#,
        ),
        (
            ResourceRequest::new("logbuckets").with_param("ProjectId", "p1"),
            r#"{"error": "Failed to list log buckets. Please check your project ID and permissions."}"#,
        ),
        (
            ResourceRequest::new("logviews")
                .with_param("ProjectId", "p1")
                .with_param("BucketId", "b1"),
            r#"{"error": "Failed to list log views. Please check your bucket ID and permissions."}"#,
        ),
    ];

    for (req, body) in cases {
        let resp = ds.call_resource(&ctx, &req).await;
        assert_eq!(resp.status, StatusCode::BAD_GATEWAY, "{}", req.path);
        assert_eq!(resp.body, body);
        assert!(!resp.body.contains("nope"));
    }
}

#[tokio::test]
async fn missing_parameters_never_reach_the_provider() {
    let (ds, provider) = datasource_with(listing_provider(), FakeLocator::project("p"));
    let ctx = RequestContext::new();

    let resp = ds.call_resource(&ctx, &ResourceRequest::new("logbuckets")).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body, r#"{"error":"missing required parameter: ProjectId"}"#);

    let resp = ds
        .call_resource(&ctx, &ResourceRequest::new("logviews").with_param("ProjectId", "p1"))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body, r#"{"error":"missing required parameter: BucketId"}"#);

    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let (ds, provider) = datasource_with(listing_provider(), FakeLocator::project("p"));
    let resp = ds
        .call_resource(&RequestContext::new(), &ResourceRequest::new("logentries"))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body, "No such path");
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn default_project_alias_uses_the_locator() {
    let ctx = RequestContext::new();

    let (ds, provider) = datasource_with(listing_provider(), FakeLocator::project("gce-project"));
    let resp = ds.call_resource(&ctx, &ResourceRequest::new("gceDefaultProject")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, r#""gce-project""#);
    assert!(provider.calls().is_empty());

    let (ds, _provider) = datasource_with(listing_provider(), FakeLocator::failing());
    let resp = ds.call_resource(&ctx, &ResourceRequest::new("gceDefaultProject")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, r#""""#);
}

#[tokio::test]
async fn cancelled_listing_is_a_bad_gateway() {
    let (ds, provider) = datasource_with(listing_provider(), FakeLocator::project("p"));
    let ctx = RequestContext::new();
    ctx.cancel();
    let resp = ds.call_resource(&ctx, &ResourceRequest::new("projects")).await;
    assert_eq!(resp.status, StatusCode::BAD_GATEWAY);
    assert!(provider.calls().is_empty());
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn http_resource_route_passes_query_parameters() -> anyhow::Result<()> {
    let (ds, provider) = datasource_with(listing_provider(), FakeLocator::project("p"));
    let app = http::router(ds, Duration::from_secs(5));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/resources/logbuckets?ProjectId=p1")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(body_string(resp).await, r#"["locations/global/buckets/_Default"]"#);
    assert_eq!(provider.calls(), vec![Call::ListBuckets("p1".into())]);

    let resp = app
        .oneshot(Request::builder().uri("/resources/nowhere").body(Body::empty())?)
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(resp).await, "No such path");
    Ok(())
}

#[tokio::test]
async fn http_query_route_returns_results_by_ref_id() -> anyhow::Result<()> {
    let (ds, _provider) = datasource_with(
        FakeProvider::new().with_entries(vec![sample_entry()]),
        FakeLocator::project("p"),
    );
    let app = http::router(ds, Duration::from_secs(5));

    let body = serde_json::json!({
        "queries": [
            {
                "refId": "A",
                "maxDataPoints": 10,
                "timeRange": {"from": "2022-08-19T14:00:00Z", "to": "2022-08-19T15:00:00Z"},
                "json": {"queryText": "", "projectId": "testing"}
            },
            {
                "refId": "B",
                "timeRange": {"from": "2022-08-19T14:00:00Z", "to": "2022-08-19T15:00:00Z"},
                "json": {}
            }
        ]
    });
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
        )
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let out: serde_json::Value = serde_json::from_str(&body_string(resp).await)?;
    assert_eq!(
        out["results"]["A"]["frames"][0]["schema"]["name"],
        "b6f39be2-b298-44da-9001-1f04e5756fa0"
    );
    assert!(out["results"]["A"].get("error").is_none());
    assert!(out["results"]["B"]["error"].as_str().is_some());
    assert_eq!(out["results"]["B"]["frames"], serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn http_query_isolates_a_malformed_time_range() -> anyhow::Result<()> {
    let (ds, provider) = datasource_with(
        FakeProvider::new().with_entries(vec![sample_entry()]),
        FakeLocator::project("p"),
    );
    let app = http::router(ds, Duration::from_secs(5));

    let body = serde_json::json!({
        "queries": [
            {
                "refId": "A",
                "timeRange": {"from": "2022-08-19T14:00:00Z", "to": "2022-08-19T15:00:00Z"},
                "json": {"projectId": "testing"}
            },
            {
                "refId": "B",
                "timeRange": {"from": "yesterday", "to": "now"},
                "json": {"projectId": "testing"}
            }
        ]
    });
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
        )
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let out: serde_json::Value = serde_json::from_str(&body_string(resp).await)?;
    assert_eq!(out["results"]["A"]["frames"].as_array().map(Vec::len), Some(1));
    assert!(
        out["results"]["B"]["error"]
            .as_str()
            .is_some_and(|e| e.contains("malformed time range"))
    );
    assert_eq!(out["results"]["B"]["frames"], serde_json::json!([]));
    assert_eq!(provider.calls().len(), 1);
    Ok(())
}
