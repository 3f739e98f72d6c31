//! Database ID type definitions.

/// Alias for the integer type SQLite uses for row IDs.
pub type DatabaseId = i64;

/// Database identifier for a transaction.
///
/// IDs are assigned by the database on insert and are always positive.
pub type TransactionId = DatabaseId;
