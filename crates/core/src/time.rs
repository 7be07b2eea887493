use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{CloudlogError, Result};

/// Renders a bound of a query time window: RFC 3339, whole seconds, `Z` offset.
pub fn render_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_time_or_relative(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(duration) = humantime::parse_duration(input) {
        return Ok(Utc::now()
            - chrono::Duration::from_std(duration).map_err(|e| {
                CloudlogError::ClientInput(format!("failed to convert duration: {e}"))
            })?);
    }

    Err(CloudlogError::ClientInput(format!(
        "expected RFC3339 time or duration, got {input}"
    )))
}
