use async_trait::async_trait;
use cloudlog_core::ProviderError;
use tracing::debug;

use crate::api::ProjectLocator;
use crate::rest::client::METADATA_FLAVOR;

const PROJECT_ID_PATH: &str = "/computeMetadata/v1/project/project-id";

/// Default project fixed by configuration.
#[derive(Debug, Clone)]
pub struct StaticProjectLocator {
    project_id: String,
}

impl StaticProjectLocator {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

#[async_trait]
impl ProjectLocator for StaticProjectLocator {
    async fn default_project(&self) -> Result<String, ProviderError> {
        if self.project_id.is_empty() {
            return Err(ProviderError::Malformed("no default project configured".into()));
        }
        Ok(self.project_id.clone())
    }
}

/// Looks the default project up on the GCE metadata server.
#[derive(Debug, Clone)]
pub struct MetadataProjectLocator {
    http: reqwest::Client,
    endpoint: String,
}

impl MetadataProjectLocator {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProjectLocator for MetadataProjectLocator {
    async fn default_project(&self) -> Result<String, ProviderError> {
        let url = format!("{}{PROJECT_ID_PATH}", self.endpoint);
        debug!(%url, "resolving default project from metadata server");

        let resp = self
            .http
            .get(&url)
            .header("Metadata-Flavor", METADATA_FLAVOR)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let project_id = body.trim();
        if project_id.is_empty() {
            return Err(ProviderError::Malformed(
                "metadata server returned an empty project id".into(),
            ));
        }
        Ok(project_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_locator_returns_configured_project() {
        let locator = StaticProjectLocator::new("my-project");
        assert_eq!(locator.default_project().await.unwrap(), "my-project");
    }

    #[tokio::test]
    async fn static_locator_without_project_fails() {
        let locator = StaticProjectLocator::new("");
        assert!(locator.default_project().await.is_err());
    }
}
