//! Timestamp formatting for feed, message and notification views.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// Compact age of `then` relative to `now`: "just now", "5m", "3h", "2d",
/// then a calendar date ("Mar 4", or "Mar 4, 2024" in another year).
#[must_use]
pub fn relative_time(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let secs = (now - then).whole_seconds();
    match secs {
        s if s < MINUTE => "just now".to_owned(),
        s if s < HOUR => format!("{}m", s / MINUTE),
        s if s < DAY => format!("{}h", s / HOUR),
        s if s < WEEK => format!("{}d", s / DAY),
        _ if then.year() == now.year() => then
            .format(format_description!("[month repr:short] [day padding:none]"))
            .unwrap_or_default(),
        _ => then
            .format(format_description!("[month repr:short] [day padding:none], [year]"))
            .unwrap_or_default(),
    }
}

#[must_use]
pub fn iso_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}
