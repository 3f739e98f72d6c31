//! Transaction management for the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and managing transactions

mod core;
mod db;

pub use self::core::{
    Label, NewTransaction, Transaction, TransactionBuilder, TransactionType, parse_amount,
};
pub(crate) use self::core::{epoch_millis, from_epoch_millis, to_epoch_millis};
pub use db::{
    clear_transactions, count_transactions, create_transaction, create_transaction_table,
    delete_transaction, get_all_transactions, get_transaction, get_transactions_in_range,
    update_transaction,
};
