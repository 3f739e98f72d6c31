//! The daily reminder to record the day's expenses.
//!
//! An external scheduler calls [run_daily_reminder] periodically. The reminder
//! fires at most once per calendar day, however often it is called.

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    setting::{LAST_REMINDER_DATE_KEY, get_setting, set_setting},
};

/// Whether the reminder has not fired yet on `today`.
///
/// `today` should be the local date.
///
/// # Errors
/// Returns [Error::SqlError] if the last fired date could not be read.
pub fn should_fire(today: Date, connection: &Connection) -> Result<bool, Error> {
    let last_fired = get_setting(LAST_REMINDER_DATE_KEY, connection)?;
    let today = format_date(today);
    let should_fire = last_fired.as_deref() != Some(today.as_str());

    tracing::debug!("should fire daily reminder: {should_fire} (last fired: {last_fired:?})");

    Ok(should_fire)
}

/// Record that the reminder fired on `today`.
///
/// # Errors
/// Returns [Error::SqlError] if the date could not be saved.
pub fn mark_fired(today: Date, connection: &Connection) -> Result<(), Error> {
    set_setting(LAST_REMINDER_DATE_KEY, &format_date(today), connection)
}

/// Call `notify` and mark the reminder as fired if it has not fired on `today`.
///
/// Returns whether `notify` was called.
///
/// # Errors
/// Returns [Error::SqlError] if the last fired date could not be read or saved.
pub fn run_daily_reminder(
    today: Date,
    connection: &Connection,
    notify: impl FnOnce(),
) -> Result<bool, Error> {
    if !should_fire(today, connection)? {
        return Ok(false);
    }

    notify();
    mark_fired(today, connection)?;
    tracing::info!("daily reminder fired for {today}");

    Ok(true)
}

/// Format as `YYYY-MM-DD`.
fn format_date(date: Date) -> String {
    date.to_string()
}
