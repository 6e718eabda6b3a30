//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::{DateTime, Utc};

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(Utc::now().year())
}

/// Formats an RFC 3339 timestamp as a calendar date.
///
/// Usage in templates: `{{ order.placed_at|order_date }}`
#[askama::filter_fn]
pub fn order_date(timestamp: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_date(&timestamp.to_string()))
}

/// Anything that is not a timestamp passes through unchanged.
fn format_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_owned(),
        |parsed| parsed.with_timezone(&Utc).format("%b %-d, %Y").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05T10:15:00+00:00"), "Mar 5, 2024");
        assert_eq!(format_date("2024-03-05T23:30:00-05:00"), "Mar 6, 2024");
        assert_eq!(format_date("yesterday"), "yesterday");
    }
}
