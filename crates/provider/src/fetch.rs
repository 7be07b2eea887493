use cloudlog_core::error::Result;
use cloudlog_core::model::entry::RawLogRecord;
use cloudlog_core::query::LogQuery;
use tracing::debug;

use crate::api::LogProvider;
use crate::context::RequestContext;

const LIST_LOGS_OP: &str = "listing logs";

/// Drains provider pages for a compiled query up to its result cap.
#[derive(Debug, Clone, Copy)]
pub struct LogFetcher {
    pub default_limit: usize,
    pub max_page_size: usize,
}

impl Default for LogFetcher {
    fn default() -> Self {
        Self {
            default_limit: 1000,
            max_page_size: 1000,
        }
    }
}

impl LogFetcher {
    pub fn new(default_limit: usize, max_page_size: usize) -> Self {
        Self {
            default_limit: default_limit.max(1),
            max_page_size: max_page_size.max(1),
        }
    }

    /// Result cap for a query; non-positive limits fall back to the default.
    pub fn effective_limit(&self, requested: i64) -> usize {
        if requested <= 0 {
            self.default_limit
        } else {
            usize::try_from(requested).unwrap_or(usize::MAX)
        }
    }

    /// Returns entries in provider order. Stops paging as soon as the cap is
    /// reached or the provider has no further pages. Cancellation discards
    /// everything fetched so far.
    pub async fn fetch(
        &self,
        provider: &dyn LogProvider,
        ctx: &RequestContext,
        query: &LogQuery,
    ) -> Result<Vec<RawLogRecord>> {
        let limit = self.effective_limit(query.limit);
        let mut records: Vec<RawLogRecord> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let remaining = limit - records.len();
            let page_size = remaining.min(self.max_page_size);
            let request =
                query.entries_request(i32::try_from(page_size).unwrap_or(i32::MAX), page_token);

            let page = ctx
                .run(LIST_LOGS_OP, provider.list_entries(&request))
                .await?;
            pages += 1;

            records.extend(page.entries);
            if records.len() >= limit {
                records.truncate(limit);
                break;
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            resource = %query.resource_name,
            pages,
            count = records.len(),
            "fetched log entries"
        );
        Ok(records)
    }
}
