//! JSON backups of the transaction ledger.
//!
//! A backup is a snapshot of every transaction plus the time it was captured.
//! Backups are written to a dedicated directory as
//! `wealthwave_backup_yyyyMMdd_HHmmss.json` and restoring one replaces the
//! whole ledger in a single database transaction.
//!
//! The file format is a JSON object:
//!
//! ```json
//! {
//!   "transactions": [
//!     {
//!       "id": 1,
//!       "label": "Lunch",
//!       "amount": -12.5,
//!       "type": "EXPENSE",
//!       "category": "Food & Dining",
//!       "description": null,
//!       "date": 1760607000250
//!     }
//!   ],
//!   "timestamp": 1760607000250
//! }
//! ```
//!
//! Dates are milliseconds since the Unix epoch.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, macros::format_description};

use crate::{
    Error,
    database_id::TransactionId,
    setting::{LAST_BACKUP_KEY, get_setting, set_setting},
    transaction::{
        NewTransaction, Transaction, TransactionType, clear_transactions, create_transaction,
        epoch_millis, from_epoch_millis, get_all_transactions, to_epoch_millis,
    },
};

/// The start of every backup file name.
pub const BACKUP_PREFIX: &str = "wealthwave_backup";

/// The file extension of backup files, without the dot.
pub const BACKUP_EXTENSION: &str = "json";

/// A transaction as it appears in a backup file.
///
/// `type` is written alongside the signed amount for other readers of the
/// file and is checked against the amount's sign when the backup is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// The ID the transaction had when the backup was made.
    ///
    /// Restored transactions are given new IDs.
    pub id: TransactionId,
    /// The transaction label.
    #[serde(alias = "title")]
    pub label: String,
    /// The signed amount, negative for expenses.
    pub amount: f64,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The category name.
    pub category: String,
    /// Optional free text notes.
    #[serde(default, alias = "note")]
    pub description: Option<String>,
    /// When the transaction happened.
    #[serde(with = "epoch_millis")]
    pub date: OffsetDateTime,
}

impl From<Transaction> for BackupRecord {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            kind: transaction.kind(),
            label: transaction.label.into(),
            amount: transaction.amount,
            category: transaction.category.into(),
            description: transaction.description,
            date: transaction.date,
        }
    }
}

impl BackupRecord {
    /// Validate the record and convert it into a transaction ready to insert.
    fn to_new_transaction(&self) -> Result<NewTransaction, Error> {
        if self.amount != 0.0 && TransactionType::of_amount(self.amount) != self.kind {
            return Err(Error::InvalidBackup(format!(
                "transaction {} has type {} but an amount of {}",
                self.id, self.kind, self.amount
            )));
        }

        Transaction::build(&self.label, self.amount, self.kind, &self.category)
            .description(self.description.as_deref().unwrap_or_default())
            .date(self.date)
            .finalise()
            .map_err(|error| Error::InvalidBackup(format!("transaction {}: {error}", self.id)))
    }
}

/// An immutable snapshot of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    /// Every transaction at the time of the backup, newest first.
    pub transactions: Vec<BackupRecord>,
    /// When the backup was captured.
    #[serde(with = "epoch_millis")]
    pub timestamp: OffsetDateTime,
}

impl Backup {
    /// Encode the backup as JSON text.
    ///
    /// # Errors
    /// Returns an [Error::InvalidBackup] if the backup cannot be encoded.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|error| Error::InvalidBackup(error.to_string()))
    }

    /// Decode and validate a backup from JSON text.
    ///
    /// # Errors
    /// Returns an [Error::InvalidBackup] if `text` is not a backup object, or if
    /// any record has an empty label or category, or a type that disagrees
    /// with the sign of its amount.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let backup: Backup =
            serde_json::from_str(text).map_err(|error| Error::InvalidBackup(error.to_string()))?;

        backup.to_new_transactions()?;

        Ok(backup)
    }

    /// The file name for this backup, derived from its capture time.
    ///
    /// # Errors
    /// Returns an [Error::InvalidBackup] if the timestamp cannot be formatted.
    pub fn file_name(&self) -> Result<String, Error> {
        let timestamp = self
            .timestamp
            .format(format_description!(
                "[year][month][day]_[hour][minute][second]"
            ))
            .map_err(|error| Error::InvalidBackup(error.to_string()))?;

        Ok(format!("{BACKUP_PREFIX}_{timestamp}.{BACKUP_EXTENSION}"))
    }

    fn to_new_transactions(&self) -> Result<Vec<NewTransaction>, Error> {
        self.transactions
            .iter()
            .map(BackupRecord::to_new_transaction)
            .collect()
    }
}

/// Capture every transaction in the ledger.
///
/// `captured_at` should be the local time, it determines the file name.
///
/// # Errors
/// Returns [Error::SqlError] if the transactions could not be read.
pub fn export_backup(
    captured_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Backup, Error> {
    let transactions: Vec<BackupRecord> = get_all_transactions(connection)?
        .into_iter()
        .map(BackupRecord::from)
        .collect();

    tracing::debug!("exported {} transaction(s)", transactions.len());

    Ok(Backup {
        transactions,
        timestamp: captured_at,
    })
}

/// Export the ledger, write it to `directory` and record the time of the backup.
///
/// Returns the path of the new backup file.
///
/// # Errors
/// This function will return a:
/// - [Error::SqlError] if the ledger could not be read or the backup time saved,
/// - or [Error::BackupIo] if the file could not be written.
pub fn create_backup(
    captured_at: OffsetDateTime,
    directory: &BackupDirectory,
    connection: &Connection,
) -> Result<PathBuf, Error> {
    let backup = export_backup(captured_at, connection)?;
    let path = directory.write(&backup)?;

    set_setting(
        LAST_BACKUP_KEY,
        &to_epoch_millis(captured_at).to_string(),
        connection,
    )?;

    Ok(path)
}

/// When the last backup was created with [create_backup], in UTC.
///
/// # Errors
/// Returns [Error::SqlError] if the setting could not be read.
pub fn get_last_backup_time(connection: &Connection) -> Result<Option<OffsetDateTime>, Error> {
    let Some(text) = get_setting(LAST_BACKUP_KEY, connection)? else {
        return Ok(None);
    };

    match text.parse().ok().and_then(|millis| from_epoch_millis(millis).ok()) {
        Some(time) => Ok(Some(time)),
        None => {
            tracing::warn!("ignoring invalid last backup time {text:?}");
            Ok(None)
        }
    }
}

/// Replace every transaction in the ledger with those in `backup`.
///
/// The backup is validated before the ledger is touched, and the clear and
/// re-insert run in one database transaction: on any error the ledger is left
/// exactly as it was. Restored transactions are given new IDs.
///
/// Returns the number of transactions restored.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidBackup] if a record in `backup` is invalid,
/// - or [Error::SqlError] if the ledger could not be replaced.
pub fn restore_backup(backup: &Backup, connection: &Connection) -> Result<usize, Error> {
    let transactions = backup.to_new_transactions()?;
    let count = transactions.len();

    let sql_transaction = connection.unchecked_transaction()?;

    clear_transactions(&sql_transaction)?;

    for transaction in transactions {
        create_transaction(transaction, &sql_transaction)?;
    }

    sql_transaction.commit()?;

    tracing::info!(
        "restored {count} transaction(s) from backup taken at {}",
        backup.timestamp
    );

    Ok(count)
}

/// A backup file found in a [BackupDirectory].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    /// The full path to the file.
    pub path: PathBuf,
    /// The file name, e.g. `wealthwave_backup_20251016_093000.json`.
    pub name: String,
    /// The size of the file in bytes.
    pub size: u64,
    /// When the file was last modified.
    pub modified: SystemTime,
}

/// The directory that backup files are written to and listed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupDirectory {
    path: PathBuf,
}

impl BackupDirectory {
    /// Use the directory at `path`. It is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `backup` to a file named from its capture time.
    ///
    /// The content is written to a temporary file which is then renamed, so a
    /// failed write never leaves a partial backup behind. An existing backup
    /// with the same name is replaced.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::BackupIo] if the directory or file could not be written,
    /// - or [Error::InvalidBackup] if the backup could not be encoded.
    pub fn write(&self, backup: &Backup) -> Result<PathBuf, Error> {
        let file_name = backup.file_name()?;
        let json = backup.to_json()?;

        fs::create_dir_all(&self.path).map_err(|error| io_error(&self.path, error))?;

        let path = self.path.join(&file_name);
        let temp_path = self.path.join(format!(".{file_name}.tmp"));

        let result = fs::write(&temp_path, json).and_then(|_| fs::rename(&temp_path, &path));

        if let Err(error) = result {
            tracing::error!("could not write backup {}: {error}", path.display());
            // Best effort, the temporary file may not have been created.
            let _ = fs::remove_file(&temp_path);
            return Err(io_error(&path, error));
        }

        tracing::info!(
            "backup of {} transaction(s) written to {}",
            backup.transactions.len(),
            path.display()
        );

        Ok(path)
    }

    /// Read and validate the backup at `path`.
    ///
    /// A relative `path` is taken to be relative to this directory.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::BackupIo] if the file could not be read,
    /// - or [Error::InvalidBackup] if the content is not a valid backup.
    pub fn read(&self, path: &Path) -> Result<Backup, Error> {
        let path = self.resolve(path);
        let text = fs::read_to_string(&path).map_err(|error| io_error(&path, error))?;

        Backup::from_json(&text)
    }

    /// List the backup files in the directory, most recently modified first.
    ///
    /// Only files with the backup extension are listed. A directory that does
    /// not exist yet has no backups.
    ///
    /// # Errors
    /// Returns an [Error::BackupIo] if the directory could not be read.
    pub fn list(&self) -> Result<Vec<BackupFile>, Error> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.path).map_err(|error| io_error(&self.path, error))?;
        let mut backups = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|error| io_error(&self.path, error))?;
            let path = entry.path();

            if path.extension().and_then(|extension| extension.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }

            let metadata = entry.metadata().map_err(|error| io_error(&path, error))?;

            if !metadata.is_file() {
                continue;
            }

            backups.push(BackupFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified: metadata.modified().map_err(|error| io_error(&path, error))?,
                path,
            });
        }

        backups.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));

        Ok(backups)
    }

    /// Delete the backup at `path`, returning whether it was deleted.
    ///
    /// A relative `path` is taken to be relative to this directory. Only
    /// backup files directly inside this directory can be deleted.
    pub fn delete(&self, path: &Path) -> bool {
        let Some(path) = self.backup_file_path(path) else {
            tracing::error!(
                "refusing to delete {}, it is not a backup in {}",
                path.display(),
                self.path.display()
            );
            return false;
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("deleted backup {}", path.display());
                true
            }
            Err(error) => {
                tracing::error!("could not delete backup {}: {error}", path.display());
                false
            }
        }
    }

    /// Resolve `path` if it names a backup file directly inside this directory.
    fn backup_file_path(&self, path: &Path) -> Option<PathBuf> {
        let path = self.resolve(path);

        if path.extension().and_then(|extension| extension.to_str()) != Some(BACKUP_EXTENSION) {
            return None;
        }

        let directory = self.path.canonicalize().ok()?;
        let parent = path.parent()?.canonicalize().ok()?;

        (parent == directory).then_some(path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.path.join(path)
        }
    }
}

fn io_error(path: &Path, error: std::io::Error) -> Error {
    Error::BackupIo(path.display().to_string(), error.to_string())
}



#[cfg(test)]
mod directory_tests {
    use std::{
        fs,
        path::Path,
        time::{Duration, SystemTime},
    };

    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error, ErrorKind, Transaction, TransactionType,
        backup::{Backup, BackupDirectory, create_backup, get_last_backup_time},
        db::initialize,
        transaction::create_transaction,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn empty_backup_at(timestamp: time::OffsetDateTime) -> Backup {
        Backup {
            transactions: Vec::new(),
            timestamp,
        }
    }

    fn set_modified(path: &Path, modified: SystemTime) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[test]
    fn write_creates_directory_and_named_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path().join("backups"));

        let path = directory
            .write(&empty_backup_at(datetime!(2025-10-16 09:30:00 UTC)))
            .unwrap();

        assert!(path.is_file());
        assert_eq!(
            path.file_name().unwrap(),
            "wealthwave_backup_20251016_093000.json"
        );
    }

    #[test]
    fn write_leaves_no_temporary_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());

        directory
            .write(&empty_backup_at(datetime!(2025-10-16 09:30:00 UTC)))
            .unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["wealthwave_backup_20251016_093000.json"]);
    }

    #[test]
    fn write_fails_when_directory_is_a_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let not_a_directory = temp_dir.path().join("file");
        fs::write(&not_a_directory, "").unwrap();
        let directory = BackupDirectory::new(&not_a_directory);

        let result = directory.write(&empty_backup_at(datetime!(2025-10-16 09:30:00 UTC)));

        assert_eq!(result.map_err(|error| error.kind()), Err(ErrorKind::Io));
    }

    #[test]
    fn failed_rename_removes_temporary_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());
        let blocker = temp_dir.path().join("wealthwave_backup_20251016_093000.json");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "").unwrap();

        let result = directory.write(&empty_backup_at(datetime!(2025-10-16 09:30:00 UTC)));

        assert_eq!(result.map_err(|error| error.kind()), Err(ErrorKind::Io));
        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["wealthwave_backup_20251016_093000.json"]);
    }

    #[test]
    fn write_in_same_second_replaces_earlier_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());
        let captured_at = datetime!(2025-10-16 09:30:00 UTC);
        let conn = get_test_connection();
        let first = directory.write(&empty_backup_at(captured_at)).unwrap();
        create_transaction(
            Transaction::build("Lunch", 12.5, TransactionType::Expense, "Food & Dining")
                .date(datetime!(2025-10-16 09:00 UTC))
                .finalise()
                .unwrap(),
            &conn,
        )
        .unwrap();
        let second_backup = crate::backup::export_backup(captured_at, &conn).unwrap();

        let second = directory.write(&second_backup).unwrap();

        assert_eq!(first, second);
        assert_eq!(directory.list().unwrap().len(), 1);
        assert_eq!(directory.read(&second), Ok(second_backup));
    }

    #[test]
    fn read_returns_written_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());
        let conn = get_test_connection();
        create_transaction(
            Transaction::build("Lunch", 12.5, TransactionType::Expense, "Food & Dining")
                .date(datetime!(2025-10-02 12:30 UTC))
                .finalise()
                .unwrap(),
            &conn,
        )
        .unwrap();
        let backup = crate::backup::export_backup(datetime!(2025-10-16 09:30 UTC), &conn).unwrap();
        directory.write(&backup).unwrap();

        let read = directory
            .read(Path::new("wealthwave_backup_20251016_093000.json"))
            .unwrap();

        assert_eq!(read, backup);
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());

        let result = directory.read(Path::new("missing.json"));

        assert!(matches!(result, Err(Error::BackupIo(_, _))));
    }

    #[test]
    fn read_corrupt_file_is_format_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());
        fs::write(temp_dir.path().join("corrupt.json"), "not json").unwrap();

        let result = directory.read(Path::new("corrupt.json"));

        assert!(matches!(result, Err(Error::InvalidBackup(_))));
    }

    #[test]
    fn list_missing_directory_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path().join("nope"));

        assert_eq!(directory.list(), Ok(Vec::new()));
    }

    #[test]
    fn list_is_newest_first_and_ignores_other_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());
        let older = directory
            .write(&empty_backup_at(datetime!(2025-10-16 09:30:00 UTC)))
            .unwrap();
        let newer = directory
            .write(&empty_backup_at(datetime!(2025-10-15 09:30:00 UTC)))
            .unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "hello").unwrap();
        fs::create_dir(temp_dir.path().join("folder.json")).unwrap();
        let now = SystemTime::now();
        set_modified(&older, now - Duration::from_secs(60));
        set_modified(&newer, now);

        let paths: Vec<_> = directory
            .list()
            .unwrap()
            .into_iter()
            .map(|file| file.path)
            .collect();

        assert_eq!(paths, vec![newer, older]);
    }

    #[test]
    fn delete_reports_success_and_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());
        let path = directory
            .write(&empty_backup_at(datetime!(2025-10-16 09:30:00 UTC)))
            .unwrap();

        assert!(directory.delete(&path));
        assert!(!path.exists());
        assert!(!directory.delete(&path));
    }

    #[test]
    fn delete_refuses_files_outside_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path().join("backups"));
        directory
            .write(&empty_backup_at(datetime!(2025-10-16 09:30:00 UTC)))
            .unwrap();
        let outside = temp_dir.path().join("outside.json");
        fs::write(&outside, "{}").unwrap();

        assert!(!directory.delete(Path::new("../outside.json")));
        assert!(!directory.delete(&outside));
        assert!(outside.exists());
    }

    #[test]
    fn delete_refuses_files_without_backup_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());
        let notes = temp_dir.path().join("notes.txt");
        fs::write(&notes, "hello").unwrap();

        assert!(!directory.delete(Path::new("notes.txt")));
        assert!(notes.exists());
    }

    #[test]
    fn create_backup_records_last_backup_time() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = BackupDirectory::new(temp_dir.path());
        let conn = get_test_connection();
        let captured_at = datetime!(2025-10-16 09:30:00 +13);
        assert_eq!(get_last_backup_time(&conn), Ok(None));

        let path = create_backup(captured_at, &directory, &conn).unwrap();

        assert!(path.is_file());
        assert_eq!(get_last_backup_time(&conn), Ok(Some(captured_at)));
    }
}
