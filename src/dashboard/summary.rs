//! Aggregates the ledger into the numbers the dashboard shows.
//!
//! Purely derived data: this module only reads, so a summary can never
//! drift the ledger and two summaries over the same data always agree.

use rusqlite::{Connection, params};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    account::get_cash_account,
    db::start_of_month_sql,
    transaction::{Direction, LedgerTransaction, get_recent_transactions, sum_amount_since},
};

/// How many recent transactions the dashboard shows.
const RECENT_TRANSACTION_COUNT: u32 = 5;

/// The aggregate numbers for a user's dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// The sum of all account balances.
    pub total_balance: f64,
    /// The balance of the designated cash account, zero when the user has
    /// none yet.
    pub cash_balance: f64,
    /// Money received since the start of the current calendar month.
    pub month_in: f64,
    /// Money spent since the start of the current calendar month.
    pub month_out: f64,
    /// The sum of all outstanding debt balances.
    pub total_debt: f64,
    /// The most recent transactions, newest first.
    pub recent_transactions: Vec<LedgerTransaction>,
}

/// Compute the dashboard summary for one user.
///
/// # Errors
/// Returns [Error::Sql] if there is an SQL error.
pub fn get_summary(connection: &Connection, user_id: &str) -> Result<Summary, Error> {
    let total_balance = connection.query_one(
        "SELECT COALESCE(SUM(balance), 0) FROM account WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;

    let cash_balance = get_cash_account(connection, user_id)?
        .map(|account| account.balance)
        .unwrap_or(0.0);

    let month_start = start_of_month_sql(OffsetDateTime::now_utc())?;
    let month_in = sum_amount_since(connection, user_id, Direction::In, &month_start)?;
    let month_out = sum_amount_since(connection, user_id, Direction::Out, &month_start)?;

    let total_debt = connection.query_one(
        "SELECT COALESCE(SUM(current_balance), 0) FROM debt
         WHERE user_id = ?1 AND current_balance > 0",
        params![user_id],
        |row| row.get(0),
    )?;

    let recent_transactions =
        get_recent_transactions(connection, user_id, RECENT_TRANSACTION_COUNT)?;

    Ok(Summary {
        total_balance,
        cash_balance,
        month_in,
        month_out,
        total_debt,
        recent_transactions,
    })
}
