//! Defines the core data model and database queries for accounts.

use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{AccountId, UserId},
    db::{parse_timestamp, timestamp_to_sql},
};

/// What kind of holding an account represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// A savings account.
    Savings,
    /// A checking account.
    Checking,
    /// A credit card or credit line.
    CreditCard,
    /// An e-wallet (GCash, Maya, etc.).
    Ewallet,
    /// An investment account.
    Investment,
    /// Anything else, including the cash-on-hand account.
    Other,
}

impl AccountKind {
    /// The tag stored in the database for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Savings => "savings",
            AccountKind::Checking => "checking",
            AccountKind::CreditCard => "credit_card",
            AccountKind::Ewallet => "ewallet",
            AccountKind::Investment => "investment",
            AccountKind::Other => "other",
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "savings" => Some(AccountKind::Savings),
            "checking" => Some(AccountKind::Checking),
            "credit_card" => Some(AccountKind::CreditCard),
            "ewallet" => Some(AccountKind::Ewallet),
            "investment" => Some(AccountKind::Investment),
            "other" => Some(AccountKind::Other),
            _ => None,
        }
    }
}

impl rusqlite::ToSql for AccountKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for AccountKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().and_then(|text| {
            AccountKind::parse(text)
                .ok_or_else(|| FromSqlError::Other(format!("unknown account kind {text:?}").into()))
        })
    }
}

/// A cash holding, bank account, e-wallet or credit line owned by one user.
///
/// `balance` is the authoritative running total for the account. It is only
/// ever changed by the ledger engine, which keeps it equal to the sum of all
/// signed transaction amounts applied to the account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The ID of the owning user.
    pub user_id: UserId,
    /// The name of the bank or institution holding the account.
    pub bank_name: String,
    /// The display name of the account.
    pub name: String,
    /// The kind of account.
    pub kind: AccountKind,
    /// The current balance. May go negative for credit lines.
    pub balance: f64,
    /// Whether this is the user's designated cash-on-hand account.
    ///
    /// Each user has at most one cash account, enforced by a unique index.
    pub is_cash: bool,
    /// When the account was created (server-assigned, UTC).
    pub created_at: OffsetDateTime,
}

/// Create the account table and its indexes.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            bank_name TEXT NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            balance REAL NOT NULL DEFAULT 0,
            is_cash INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_user ON account(user_id)",
        (),
    )?;

    // One cash account per user.
    connection.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS account_cash_unique
         ON account(user_id) WHERE is_cash = 1",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [Account].
pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let bank_name = row.get(2)?;
    let name = row.get(3)?;
    let kind = row.get(4)?;
    let balance = row.get(5)?;
    let is_cash = row.get(6)?;
    let created_at = parse_timestamp(row, 7)?;

    Ok(Account {
        id,
        user_id,
        bank_name,
        name,
        kind,
        balance,
        is_cash,
        created_at,
    })
}

const ACCOUNT_COLUMNS: &str = "id, user_id, bank_name, name, kind, balance, is_cash, created_at";

/// Insert a new account with a zero balance.
///
/// Opening balances go through the ledger engine as an initial-deposit
/// transaction, never straight into the row.
///
/// # Errors
/// Returns [Error::DuplicateCashAccount] when `is_cash` is set and the user
/// already has a cash account, or [Error::Sql] for any other SQL error.
pub fn insert_account(
    connection: &Connection,
    user_id: &str,
    bank_name: &str,
    name: &str,
    kind: AccountKind,
    is_cash: bool,
) -> Result<Account, Error> {
    let account = connection
        .prepare(&format!(
            "INSERT INTO account (user_id, bank_name, name, kind, balance, is_cash, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)
             RETURNING {ACCOUNT_COLUMNS}"
        ))?
        .query_row(
            params![
                user_id,
                bank_name,
                name,
                kind,
                is_cash,
                timestamp_to_sql(OffsetDateTime::now_utc())?,
            ],
            map_row_to_account,
        )
        .map_err(Error::from)?;

    Ok(account)
}

/// Retrieve an account by id, scoped to its owner.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to an account owned by
/// `user_id`, or [Error::Sql] for any other SQL error.
pub fn get_account(connection: &Connection, user_id: &str, id: AccountId) -> Result<Account, Error> {
    connection
        .query_one(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            map_row_to_account,
        )
        .map_err(Error::from)
}

/// Retrieve all of a user's accounts, cash account first.
pub fn get_accounts(connection: &Connection, user_id: &str) -> Result<Vec<Account>, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM account
         WHERE user_id = ?1
         ORDER BY is_cash DESC, name ASC"
    ))?;

    let accounts = statement
        .query_map(params![user_id], map_row_to_account)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(accounts)
}

/// Retrieve the user's designated cash account, if one exists.
pub fn get_cash_account(connection: &Connection, user_id: &str) -> Result<Option<Account>, Error> {
    match connection.query_one(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE user_id = ?1 AND is_cash = 1"),
        params![user_id],
        map_row_to_account,
    ) {
        Ok(account) => Ok(Some(account)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Update an account's descriptive fields. The balance is left alone; it is
/// only changed by the ledger engine.
///
/// Returns the number of rows affected (zero when the account does not
/// exist or is not owned by `user_id`).
pub fn update_account_details(
    connection: &Connection,
    user_id: &str,
    id: AccountId,
    bank_name: &str,
    name: &str,
    kind: AccountKind,
) -> Result<usize, Error> {
    connection
        .execute(
            "UPDATE account SET bank_name = ?1, name = ?2, kind = ?3
             WHERE id = ?4 AND user_id = ?5",
            params![bank_name, name, kind, id, user_id],
        )
        .map_err(Error::from)
}

/// Delete an account row, scoped to its owner.
///
/// Returns the number of rows affected.
pub fn delete_account_row(
    connection: &Connection,
    user_id: &str,
    id: AccountId,
) -> Result<usize, Error> {
    connection
        .execute(
            "DELETE FROM account WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )
        .map_err(Error::from)
}
