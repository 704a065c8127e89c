//! Database schema initialization and shared storage helpers.
//!
//! Everything the service persists lives in four tables: `account`, `debt`,
//! `ledger_transaction` and `audit_entry`. The ledger engine groups all
//! writes for one use case in a single SQLite transaction
//! ([rusqlite::Connection::transaction]), so a failed commit leaves the
//! ledger untouched.

use rusqlite::{Connection, Row, types::Type};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    account::create_account_table, audit::create_audit_entry_table, debt::create_debt_table,
    transaction::create_transaction_table,
};

/// Create the tables and indexes for the domain models.
///
/// # Errors
/// Returns an error if any table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute("PRAGMA foreign_keys = ON", ())?;

    create_account_table(connection)?;
    create_debt_table(connection)?;
    create_transaction_table(connection)?;
    create_audit_entry_table(connection)?;

    Ok(())
}

/// Format a timestamp for storage as an RFC 3339 TEXT column.
///
/// All timestamps are server-assigned UTC, so the stored strings sort
/// chronologically and never depend on a client clock. Fractional seconds
/// are truncated before formatting: mixed-precision strings do not sort
/// lexicographically (`00:00:00.5Z` sorts before `00:00:00Z`), and the
/// stored strings are compared with `>=` in SQL.
pub(crate) fn timestamp_to_sql(timestamp: OffsetDateTime) -> Result<String, rusqlite::Error> {
    timestamp
        .replace_nanosecond(0)
        .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?
        .format(&Rfc3339)
        .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))
}

/// The stored form of the first instant of `timestamp`'s calendar month,
/// for comparing against `created_at` columns.
pub(crate) fn start_of_month_sql(timestamp: OffsetDateTime) -> Result<String, rusqlite::Error> {
    let month_start = timestamp
        .replace_day(1)
        .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?
        .replace_time(time::Time::MIDNIGHT);

    timestamp_to_sql(month_start)
}

/// Read an RFC 3339 TEXT column back into a timestamp.
pub(crate) fn parse_timestamp(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let text: String = row.get(index)?;

    OffsetDateTime::parse(&text, &Rfc3339)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}
