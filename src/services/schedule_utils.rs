use chrono::{DateTime, Local, NaiveDateTime};
use serde_json::json;

use crate::error::{AppError, AppResult};

/// Parses an ISO-8601 datetime string into a naive local datetime. Strings
/// carrying `Z` or an explicit offset are converted into the local zone first
/// and the zone is stripped; naive strings are taken as already local.
pub fn parse_naive_local(value: &str) -> AppResult<NaiveDateTime> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(value) {
        return Ok(aware.with_timezone(&Local).naive_local());
    }
    value.parse::<NaiveDateTime>().map_err(|err| {
        AppError::validation_with_details(
            "无效的时间格式",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

/// ISO-8601 local string without a zone suffix.
pub fn format_naive(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}
