//! Project → bucket → view listings used for editor autocompletion and
//! template variables. Stateless; lists are returned exactly as the provider
//! sent them.

use cloudlog_core::error::{CloudlogError, Result};

use crate::api::LogProvider;
use crate::context::RequestContext;

pub const PROJECT_ID_PARAM: &str = "ProjectId";
pub const BUCKET_ID_PARAM: &str = "BucketId";

pub async fn list_projects(provider: &dyn LogProvider, ctx: &RequestContext) -> Result<Vec<String>> {
    ctx.run("listing projects", provider.list_projects()).await
}

pub async fn list_buckets(
    provider: &dyn LogProvider,
    ctx: &RequestContext,
    project_id: &str,
) -> Result<Vec<String>> {
    let project_id = required(PROJECT_ID_PARAM, project_id)?;
    ctx.run("listing log buckets", provider.list_buckets(project_id))
        .await
}

pub async fn list_views(
    provider: &dyn LogProvider,
    ctx: &RequestContext,
    project_id: &str,
    bucket_id: &str,
) -> Result<Vec<String>> {
    let project_id = required(PROJECT_ID_PARAM, project_id)?;
    let bucket_id = required(BUCKET_ID_PARAM, bucket_id)?;
    ctx.run("listing log views", provider.list_views(project_id, bucket_id))
        .await
}

fn required<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CloudlogError::MissingParameter(name.to_string()));
    }
    Ok(value)
}
