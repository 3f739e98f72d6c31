//! Database operations for transactions.

use rusqlite::{Connection, Row, types::Type};
use time::OffsetDateTime;

use crate::{
    Error,
    category::CategoryName,
    database_id::TransactionId,
    transaction::{
        Label, NewTransaction, Transaction,
        core::{from_epoch_millis, to_epoch_millis},
    },
};

const SELECT_COLUMNS: &str =
    "SELECT id, label, amount, category, description, date FROM \"transaction\"";

/// Create a new transaction in the database and return it with its new ID.
///
/// # Errors
/// This function will return a [Error::SqlError] if the row could not be written.
pub fn create_transaction(
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (label, amount, category, description, date)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, label, amount, category, description, date",
        )?
        .query_row(
            (
                transaction.label().as_ref(),
                transaction.amount(),
                transaction.category().as_ref(),
                transaction.description(),
                to_epoch_millis(transaction.date()),
            ),
            map_transaction_row,
        )?;

    tracing::debug!("created transaction {}", transaction.id);

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!("{SELECT_COLUMNS} WHERE id = :id"))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve every transaction, newest first.
///
/// Transactions with the same date are returned in the order they were
/// inserted.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!("{SELECT_COLUMNS} ORDER BY date DESC, id ASC"))?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the transactions dated within `start` (inclusive) to `end`
/// (exclusive), newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_transactions_in_range(
    start: OffsetDateTime,
    end: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE date >= ?1 AND date < ?2 ORDER BY date DESC, id ASC"
        ))?
        .query_map(
            (to_epoch_millis(start), to_epoch_millis(end)),
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Overwrite every field of the transaction with `id`.
///
/// Returns the number of rows changed, which is zero if `id` does not refer to
/// a stored transaction.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn update_transaction(
    id: TransactionId,
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<usize, Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
         SET label = ?1, amount = ?2, category = ?3, description = ?4, date = ?5
         WHERE id = ?6",
        (
            transaction.label().as_ref(),
            transaction.amount(),
            transaction.category().as_ref(),
            transaction.description(),
            to_epoch_millis(transaction.date()),
            id,
        ),
    )?;

    if rows_affected == 0 {
        tracing::warn!("tried to update transaction {id}, which is not in the database");
    }

    Ok(rows_affected)
}

/// Delete the transaction with `id`.
///
/// Returns the number of rows deleted: one, or zero if `id` does not refer to
/// a stored transaction.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<usize, Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    tracing::debug!("deleted {rows_affected} transaction(s) with id {id}");

    Ok(rows_affected)
}

/// Delete every transaction and return how many were removed.
///
/// IDs are not reset, new transactions continue from the highest ID ever used.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn clear_transactions(connection: &Connection) -> Result<usize, Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\"", [])?;

    tracing::info!("cleared {rows_affected} transaction(s)");

    Ok(rows_affected)
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL CHECK (label <> ''),
            amount REAL NOT NULL,
            category TEXT NOT NULL CHECK (category <> ''),
            description TEXT,
            date INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_label: String = row.get(1)?;
    let amount = row.get(2)?;
    let raw_category: String = row.get(3)?;
    let description = row.get(4)?;
    let raw_date: i64 = row.get(5)?;
    let date = from_epoch_millis(raw_date).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(5, Type::Integer, Box::new(error))
    })?;

    Ok(Transaction {
        id,
        label: Label::new_unchecked(&raw_label),
        amount,
        category: CategoryName::new_unchecked(&raw_category),
        description,
        date,
    })
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{
        Error, Transaction, TransactionType,
        db::initialize,
        transaction::{
            NewTransaction, clear_transactions, count_transactions, create_transaction,
            delete_transaction, get_all_transactions, get_transaction, get_transactions_in_range,
            update_transaction,
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn expense_at(label: &str, amount: f64, date: OffsetDateTime) -> NewTransaction {
        Transaction::build(label, amount, TransactionType::Expense, "Food & Dining")
            .date(date)
            .finalise()
            .unwrap()
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let new_transaction =
            Transaction::build("Salary", 3000.0, TransactionType::Income, "Salary")
                .description("October")
                .date(datetime!(2025-10-01 09:00 UTC))
                .finalise()
                .unwrap();

        let transaction = create_transaction(new_transaction.clone(), &conn)
            .expect("Could not create transaction");

        assert!(transaction.id > 0);
        assert_eq!(&transaction.label, new_transaction.label());
        assert_eq!(transaction.amount, 3000.0);
        assert_eq!(&transaction.category, new_transaction.category());
        assert_eq!(transaction.description.as_deref(), Some("October"));
        assert_eq!(transaction.date, new_transaction.date());
    }

    #[test]
    fn created_transaction_is_listed_unchanged() {
        let conn = get_test_connection();
        let new_transaction = expense_at("Lunch", 12.34, datetime!(2025-10-02 12:00:00.5 UTC));
        let created = create_transaction(new_transaction.clone(), &conn).unwrap();

        let all = get_all_transactions(&conn).unwrap();

        assert_eq!(all, vec![created.clone()]);
        assert_eq!(all[0].amount, new_transaction.amount());
        assert_eq!(all[0].date, new_transaction.date());
        assert_eq!(all[0].kind(), TransactionType::Expense);
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let conn = get_test_connection();
        let date = datetime!(2025-10-02 12:00 UTC);
        let first = create_transaction(expense_at("A", 1.0, date), &conn).unwrap();
        clear_transactions(&conn).unwrap();

        let second = create_transaction(expense_at("B", 1.0, date), &conn).unwrap();

        assert!(second.id > first.id);
    }

    #[test]
    fn get_transaction_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();

        let result = get_transaction(42, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_all_orders_by_date_descending() {
        let conn = get_test_connection();
        let d1 = datetime!(2025-10-01 08:00 UTC);
        let d2 = datetime!(2025-10-02 08:00 UTC);
        let d3 = datetime!(2025-10-03 08:00 UTC);
        // Insert out of order to make sure the query sorts.
        create_transaction(expense_at("Second", 2.0, d2), &conn).unwrap();
        create_transaction(expense_at("Third", 3.0, d3), &conn).unwrap();
        create_transaction(expense_at("First", 1.0, d1), &conn).unwrap();

        let dates: Vec<_> = get_all_transactions(&conn)
            .unwrap()
            .into_iter()
            .map(|transaction| transaction.date)
            .collect();

        assert_eq!(dates, vec![d3, d2, d1]);
    }

    #[test]
    fn get_all_breaks_ties_by_insertion_order() {
        let conn = get_test_connection();
        let date = datetime!(2025-10-01 08:00 UTC);
        let first = create_transaction(expense_at("First", 1.0, date), &conn).unwrap();
        let second = create_transaction(expense_at("Second", 2.0, date), &conn).unwrap();

        let all = get_all_transactions(&conn).unwrap();

        assert_eq!(all, vec![first, second]);
    }

    #[test]
    fn get_in_range_excludes_end() {
        let conn = get_test_connection();
        let start = datetime!(2025-10-01 00:00 UTC);
        let end = start + Duration::days(31);
        let inside = create_transaction(expense_at("Inside", 1.0, start), &conn).unwrap();
        create_transaction(expense_at("At end", 1.0, end), &conn).unwrap();
        create_transaction(
            expense_at("Before", 1.0, start - Duration::milliseconds(1)),
            &conn,
        )
        .unwrap();

        let got = get_transactions_in_range(start, end, &conn).unwrap();

        assert_eq!(got, vec![inside]);
    }

    #[test]
    fn update_overwrites_all_fields() {
        let conn = get_test_connection();
        let created = create_transaction(
            expense_at("Lunch", 12.0, datetime!(2025-10-01 12:00 UTC)),
            &conn,
        )
        .unwrap();
        let replacement = Transaction::build("Refund", 5.0, TransactionType::Income, "Other")
            .description("Returned shoes")
            .date(datetime!(2025-10-05 10:00 UTC))
            .finalise()
            .unwrap();

        let rows_affected = update_transaction(created.id, replacement.clone(), &conn).unwrap();

        assert_eq!(rows_affected, 1);
        let updated = get_transaction(created.id, &conn).unwrap();
        assert_eq!(&updated.label, replacement.label());
        assert_eq!(updated.amount, 5.0);
        assert_eq!(updated.kind(), TransactionType::Income);
        assert_eq!(updated.category.as_ref(), "Other");
        assert_eq!(updated.description.as_deref(), Some("Returned shoes"));
        assert_eq!(updated.date, replacement.date());
    }

    #[test]
    fn update_clears_description() {
        let conn = get_test_connection();
        let created = create_transaction(
            Transaction::build("Lunch", 12.0, TransactionType::Expense, "Food")
                .description("With friends")
                .finalise()
                .unwrap(),
            &conn,
        )
        .unwrap();

        update_transaction(
            created.id,
            created.to_builder().description("").finalise().unwrap(),
            &conn,
        )
        .unwrap();

        let updated = get_transaction(created.id, &conn).unwrap();
        assert_eq!(updated.description, None);
    }

    #[test]
    fn update_missing_transaction_affects_no_rows() {
        let conn = get_test_connection();

        let rows_affected = update_transaction(
            999,
            expense_at("Ghost", 1.0, datetime!(2025-10-01 12:00 UTC)),
            &conn,
        )
        .unwrap();

        assert_eq!(rows_affected, 0);
        assert_eq!(count_transactions(&conn), Ok(0));
    }

    #[test]
    fn delete_succeeds() {
        let conn = get_test_connection();
        let created = create_transaction(
            expense_at("Lunch", 12.0, datetime!(2025-10-01 12:00 UTC)),
            &conn,
        )
        .unwrap();

        let rows_affected = delete_transaction(created.id, &conn).unwrap();

        assert_eq!(rows_affected, 1);
        assert_eq!(get_transaction(created.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_missing_transaction_returns_zero_and_changes_nothing() {
        let conn = get_test_connection();
        let created = create_transaction(
            expense_at("Lunch", 12.0, datetime!(2025-10-01 12:00 UTC)),
            &conn,
        )
        .unwrap();

        let rows_affected = delete_transaction(created.id + 100, &conn).unwrap();

        assert_eq!(rows_affected, 0);
        assert_eq!(get_all_transactions(&conn).unwrap(), vec![created]);
    }

    #[test]
    fn clear_removes_everything() {
        let conn = get_test_connection();
        let date = datetime!(2025-10-01 12:00 UTC);
        for i in 1..=5 {
            create_transaction(expense_at("Item", i as f64, date), &conn).unwrap();
        }

        let removed = clear_transactions(&conn).unwrap();

        assert_eq!(removed, 5);
        assert_eq!(count_transactions(&conn), Ok(0));
    }

    #[test]
    fn get_count() {
        let conn = get_test_connection();
        let date = datetime!(2025-10-05 00:00 UTC);
        let want_count = 20;
        for i in 1..=want_count {
            create_transaction(expense_at("Item", i as f64, date), &conn)
                .expect("Could not create transaction");
        }

        let got_count = count_transactions(&conn).expect("Could not get count");

        assert_eq!(want_count, got_count);
    }

    #[test]
    fn table_rejects_empty_label() {
        let conn = get_test_connection();

        let result = conn.execute(
            "INSERT INTO \"transaction\" (label, amount, category, date)
             VALUES ('', 1.0, 'Food', 0)",
            [],
        );

        assert!(result.is_err());
    }
}
