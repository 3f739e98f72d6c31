//! WealthWave is a personal finance ledger.
//!
//! This library provides the persistence layer for recording income and
//! expense transactions, a monthly budget tracker, a daily reminder trigger and
//! a JSON backup/restore routine. All state lives in a single SQLite database
//! that callers open and pass to each operation.

#![warn(missing_docs)]

mod backup;
mod budget;
mod category;
mod database_id;
mod db;
mod reminder;
mod setting;
mod summary;
mod timezone;
mod transaction;

pub use backup::{
    BACKUP_EXTENSION, BACKUP_PREFIX, Backup, BackupDirectory, BackupFile, BackupRecord,
    create_backup, export_backup, get_last_backup_time, restore_backup,
};
pub use budget::{
    BudgetChange, BudgetStatus, BudgetSummary, WARNING_THRESHOLD, check_budget_status,
    classify_budget, current_month_expenses, get_budget_summary, get_monthly_budget,
    set_monthly_budget,
};
pub use category::{CategoryName, default_categories};
pub use database_id::{DatabaseId, TransactionId};
pub use db::initialize as initialize_db;
pub use reminder::{mark_fired, run_daily_reminder, should_fire};
pub use setting::{get_currency, get_setting, set_currency, set_setting};
pub use summary::{CategoryTotal, LedgerSummary, expenses_by_category, summarise};
pub use timezone::{get_local_offset, now_in_timezone};
pub use transaction::{
    Label, NewTransaction, Transaction, TransactionBuilder, TransactionType, clear_transactions,
    count_transactions, create_transaction, delete_transaction, get_all_transactions,
    get_transaction, get_transactions_in_range, parse_amount, update_transaction,
};

/// The broad groups of failures that callers report to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input. The operation was aborted without any effect.
    Validation,
    /// The database could not be read or written.
    Persistence,
    /// Backup content is corrupt or incompatible.
    Format,
    /// A backup file could not be read or written.
    Io,
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A transaction label was empty or only whitespace.
    #[error("label cannot be empty")]
    EmptyLabel,

    /// A category name was empty or only whitespace.
    #[error("category cannot be empty")]
    EmptyCategory,

    /// An amount could not be parsed or was not a finite number.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// The monthly budget must be zero (unset) or positive.
    #[error("monthly budget cannot be negative, got {0}")]
    NegativeBudget(f64),

    /// A date was too close to the limits of the supported calendar, e.g. a
    /// month boundary after the year 9999.
    #[error("date out of range: {0}")]
    DateOutOfRange(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// The backup content could not be decoded or failed validation.
    ///
    /// Restoring from such a backup is aborted before the ledger is touched.
    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    /// A backup file or the backup directory could not be accessed.
    ///
    /// Callers should pass in the path that was being accessed and the
    /// original error as a string.
    #[error("could not access backup file {0}: {1}")]
    BackupIo(String, String),
}

impl Error {
    /// Which group of failures this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyLabel
            | Error::EmptyCategory
            | Error::InvalidAmount(_)
            | Error::NegativeBudget(_)
            | Error::DateOutOfRange(_) => ErrorKind::Validation,
            Error::NotFound | Error::SqlError(_) => ErrorKind::Persistence,
            Error::InvalidBackup(_) => ErrorKind::Format,
            Error::BackupIo(_, _) => ErrorKind::Io,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
