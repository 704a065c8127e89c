//! The transaction recorder: writes the immutable narrative of a money
//! movement.
//!
//! The recorder only records; it never touches balances. Ledger operations
//! pair each recorded transaction with the matching balance mutation inside
//! the same database transaction.

use rusqlite::Connection;

use crate::{
    Error,
    transaction::{LedgerTransaction, NewLedgerTransaction, insert_transaction},
};

/// Record one transaction together with its direction-specific subrecord.
///
/// # Errors
/// Returns [Error::InvalidAmount] when the amount is zero or negative, or
/// [Error::Sql] for any SQL error.
pub fn record(
    connection: &Connection,
    user_id: &str,
    transaction: NewLedgerTransaction,
) -> Result<LedgerTransaction, Error> {
    if transaction.amount <= 0.0 {
        return Err(Error::InvalidAmount(transaction.amount));
    }

    insert_transaction(connection, user_id, &transaction)
}
