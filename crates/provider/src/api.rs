use async_trait::async_trait;
use cloudlog_core::ProviderError;
use cloudlog_core::model::entry::{EntriesPage, EntriesRequest};

/// Authenticated client for a cloud log provider.
///
/// Implementations must be safe to share across concurrent requests. Creating
/// and closing the client is the owner's job, never the query pipeline's.
#[async_trait]
pub trait LogProvider: Send + Sync {
    /// Fetches one page of log entries.
    async fn list_entries(&self, request: &EntriesRequest) -> Result<EntriesPage, ProviderError>;

    async fn list_projects(&self) -> Result<Vec<String>, ProviderError>;

    /// Log buckets in a project, as project-relative `locations/<loc>/buckets/<id>` names.
    async fn list_buckets(&self, project_id: &str) -> Result<Vec<String>, ProviderError>;

    async fn list_views(
        &self,
        project_id: &str,
        bucket_id: &str,
    ) -> Result<Vec<String>, ProviderError>;

    async fn close(&self) -> Result<(), ProviderError>;
}

/// Resolves the project used when the caller has not picked one.
#[async_trait]
pub trait ProjectLocator: Send + Sync {
    async fn default_project(&self) -> Result<String, ProviderError>;
}
