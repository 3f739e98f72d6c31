//! Key-value settings stored alongside the ledger.
//!
//! The monthly budget, the date the daily reminder last fired, the display
//! currency and the time of the last backup are all kept here.

use rusqlite::{Connection, OptionalExtension};

use crate::Error;

/// The key for the monthly budget, stored as a decimal string.
pub(crate) const MONTHLY_BUDGET_KEY: &str = "monthly_budget";
/// The key for the last date the daily reminder fired, stored as `YYYY-MM-DD`.
pub(crate) const LAST_REMINDER_DATE_KEY: &str = "last_reminder_date";
/// The key for the time of the last backup, stored as epoch milliseconds.
pub(crate) const LAST_BACKUP_KEY: &str = "last_backup";
const CURRENCY_KEY: &str = "currency";
const DEFAULT_CURRENCY: &str = "$";

/// Create the setting table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_setting_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS setting (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Get the value stored under `key`, or `None` if it has never been set.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_setting(key: &str, connection: &Connection) -> Result<Option<String>, Error> {
    connection
        .query_row("SELECT value FROM setting WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|error| error.into())
}

/// Store `value` under `key`, replacing any previous value.
///
/// # Errors
/// Returns [Error::SqlError] if the write fails.
pub fn set_setting(key: &str, value: &str, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO setting (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (key, value),
    )?;

    tracing::debug!("set {key} to {value:?}");

    Ok(())
}

/// The symbol used when displaying amounts, "$" by default.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_currency(connection: &Connection) -> Result<String, Error> {
    Ok(get_setting(CURRENCY_KEY, connection)?.unwrap_or_else(|| DEFAULT_CURRENCY.to_owned()))
}

/// Set the symbol used when displaying amounts.
///
/// # Errors
/// Returns [Error::SqlError] if the write fails.
pub fn set_currency(symbol: &str, connection: &Connection) -> Result<(), Error> {
    set_setting(CURRENCY_KEY, symbol.trim(), connection)
}
