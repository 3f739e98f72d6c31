//! Resolves the local time from a canonical timezone name.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Get the current UTC offset for `canonical_timezone`, e.g. "Pacific/Auckland".
///
/// Returns `None` if the timezone name is not recognised.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The current date and time in `canonical_timezone`.
///
/// Falls back to UTC with a warning if the timezone name is not recognised.
pub fn now_in_timezone(canonical_timezone: &str) -> OffsetDateTime {
    let offset = get_local_offset(canonical_timezone).unwrap_or_else(|| {
        tracing::warn!("unknown timezone \"{canonical_timezone}\", falling back to UTC");
        UtcOffset::UTC
    });

    OffsetDateTime::now_utc().to_offset(offset)
}
