//! Defines the core data model and database queries for debts.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{DebtId, TransactionId, UserId},
    db::{parse_timestamp, timestamp_to_sql},
    money::EPSILON,
};

/// A liability owed by the user.
///
/// `current_balance` is the amount still owed and is mutated by the ledger
/// engine: payments (money-out) reduce it, additional borrowing (money-in
/// against an existing debt) grows it along with `total_amount`. Under
/// normal operation `0 <= current_balance <= total_amount`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Debt {
    /// The ID of the debt.
    pub id: DebtId,
    /// The ID of the owning user.
    pub user_id: UserId,
    /// The display name of the debt.
    pub name: String,
    /// A text description of the debt.
    pub description: String,
    /// The original/total principal. Grows when more is borrowed.
    pub total_amount: f64,
    /// The amount still owed. Never goes below zero.
    pub current_balance: f64,
    /// The interest rate as a percentage, e.g. `4.5`.
    pub interest_rate: f64,
    /// The date the debt should be settled by.
    pub deadline: Date,
    /// The money-in transaction that created this debt, when it was created
    /// by recording a new loan.
    pub originating_transaction_id: Option<TransactionId>,
    /// When the debt was created (server-assigned, UTC).
    pub created_at: OffsetDateTime,
}

/// The fields needed to create a debt.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDebt {
    /// The display name of the debt.
    pub name: String,
    /// A text description of the debt.
    #[serde(default)]
    pub description: String,
    /// The original/total principal.
    pub total_amount: f64,
    /// The amount currently owed.
    pub current_balance: f64,
    /// The interest rate as a percentage.
    #[serde(default)]
    pub interest_rate: f64,
    /// The date the debt should be settled by.
    pub deadline: Date,
    /// The money-in transaction that created this debt, if any.
    #[serde(skip)]
    pub originating_transaction_id: Option<TransactionId>,
}

impl NewDebt {
    /// Check the field ranges: the total must be positive, the current
    /// balance non-negative and no greater than the total.
    ///
    /// # Errors
    /// Returns [Error::InvalidRange] describing the first violated rule.
    pub fn validate(&self) -> Result<(), Error> {
        validate_debt_amounts(&self.name, self.total_amount, self.current_balance)
    }
}

pub(crate) fn validate_debt_amounts(
    name: &str,
    total_amount: f64,
    current_balance: f64,
) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::InvalidRange("the debt name cannot be empty".to_owned()));
    }

    if total_amount <= 0.0 {
        return Err(Error::InvalidRange(
            "the total amount must be positive".to_owned(),
        ));
    }

    if current_balance < 0.0 {
        return Err(Error::InvalidRange(
            "the current balance cannot be negative".to_owned(),
        ));
    }

    if current_balance > total_amount + EPSILON {
        return Err(Error::InvalidRange(
            "the current balance cannot exceed the total amount".to_owned(),
        ));
    }

    Ok(())
}

/// Create the debt table and its indexes.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_debt_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS debt (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            total_amount REAL NOT NULL,
            current_balance REAL NOT NULL,
            interest_rate REAL NOT NULL DEFAULT 0,
            deadline TEXT NOT NULL,
            originating_transaction_id INTEGER,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    // The dashboard and debt pickers select open debts by user.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_debt_user_balance ON debt(user_id, current_balance)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Debt].
pub fn map_row_to_debt(row: &Row) -> Result<Debt, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let name = row.get(2)?;
    let description = row.get(3)?;
    let total_amount = row.get(4)?;
    let current_balance = row.get(5)?;
    let interest_rate = row.get(6)?;
    let deadline = row.get(7)?;
    let originating_transaction_id = row.get(8)?;
    let created_at = parse_timestamp(row, 9)?;

    Ok(Debt {
        id,
        user_id,
        name,
        description,
        total_amount,
        current_balance,
        interest_rate,
        deadline,
        originating_transaction_id,
        created_at,
    })
}

const DEBT_COLUMNS: &str = "id, user_id, name, description, total_amount, current_balance, \
                            interest_rate, deadline, originating_transaction_id, created_at";

/// Insert a new debt. The fields are assumed to be validated by the caller.
pub fn insert_debt(connection: &Connection, user_id: &str, debt: &NewDebt) -> Result<Debt, Error> {
    let debt = connection
        .prepare(&format!(
            "INSERT INTO debt (user_id, name, description, total_amount, current_balance,
                               interest_rate, deadline, originating_transaction_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING {DEBT_COLUMNS}"
        ))?
        .query_row(
            params![
                user_id,
                debt.name,
                debt.description,
                debt.total_amount,
                debt.current_balance,
                debt.interest_rate,
                debt.deadline,
                debt.originating_transaction_id,
                timestamp_to_sql(OffsetDateTime::now_utc())?,
            ],
            map_row_to_debt,
        )
        .map_err(Error::from)?;

    Ok(debt)
}

/// Retrieve a debt by id, scoped to its owner.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a debt owned by
/// `user_id`, or [Error::Sql] for any other SQL error.
pub fn get_debt(connection: &Connection, user_id: &str, id: DebtId) -> Result<Debt, Error> {
    connection
        .query_one(
            &format!("SELECT {DEBT_COLUMNS} FROM debt WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            map_row_to_debt,
        )
        .map_err(Error::from)
}

/// Retrieve all of a user's debts, soonest deadline first.
pub fn get_debts(connection: &Connection, user_id: &str) -> Result<Vec<Debt>, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT {DEBT_COLUMNS} FROM debt WHERE user_id = ?1 ORDER BY deadline ASC, id ASC"
    ))?;

    let debts = statement
        .query_map(params![user_id], map_row_to_debt)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(debts)
}

/// Update a debt's fields. Balance changes driven by money movement go
/// through the ledger engine instead; this is for owner-facing corrections.
///
/// Returns the number of rows affected.
pub fn update_debt_fields(
    connection: &Connection,
    user_id: &str,
    id: DebtId,
    debt: &NewDebt,
) -> Result<usize, Error> {
    connection
        .execute(
            "UPDATE debt SET name = ?1, description = ?2, total_amount = ?3,
                             current_balance = ?4, interest_rate = ?5, deadline = ?6
             WHERE id = ?7 AND user_id = ?8",
            params![
                debt.name,
                debt.description,
                debt.total_amount,
                debt.current_balance,
                debt.interest_rate,
                debt.deadline,
                id,
                user_id,
            ],
        )
        .map_err(Error::from)
}

/// Grow a debt's total principal by `amount` as a single atomic increment.
///
/// Used when a money-in transaction borrows more against an existing debt;
/// the ledger engine separately applies the same delta to the current
/// balance.
pub fn grow_debt_total(
    connection: &Connection,
    user_id: &str,
    id: DebtId,
    amount: f64,
) -> Result<usize, Error> {
    connection
        .execute(
            "UPDATE debt SET total_amount = total_amount + ?1 WHERE id = ?2 AND user_id = ?3",
            params![amount, id, user_id],
        )
        .map_err(Error::from)
}

/// Delete a debt row, scoped to its owner.
///
/// Returns the number of rows affected.
pub fn delete_debt_row(connection: &Connection, user_id: &str, id: DebtId) -> Result<usize, Error> {
    connection
        .execute(
            "DELETE FROM debt WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        debt::core::{NewDebt, get_debt, get_debts, insert_debt},
    };

    fn new_debt(name: &str, total: f64, current: f64) -> NewDebt {
        NewDebt {
            name: name.to_owned(),
            description: String::new(),
            total_amount: total,
            current_balance: current,
            interest_rate: 0.0,
            deadline: date!(2026 - 12 - 31),
            originating_transaction_id: None,
        }
    }

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_and_get_round_trips() {
        let conn = get_test_connection();

        let debt = insert_debt(&conn, "user-1", &new_debt("Car Loan", 10000.0, 8000.0))
            .expect("could not insert debt");

        let got = get_debt(&conn, "user-1", debt.id).expect("could not get debt");
        assert_eq!(debt, got);
        assert_eq!(got.total_amount, 10000.0);
        assert_eq!(got.current_balance, 8000.0);
    }

    #[test]
    fn get_is_scoped_to_owner() {
        let conn = get_test_connection();
        let debt = insert_debt(&conn, "user-1", &new_debt("Car Loan", 10000.0, 8000.0)).unwrap();

        assert_eq!(get_debt(&conn, "someone-else", debt.id), Err(Error::NotFound));
    }

    #[test]
    fn debts_ordered_by_deadline() {
        let conn = get_test_connection();
        let mut later = new_debt("Later", 100.0, 100.0);
        later.deadline = date!(2027 - 06 - 01);
        let mut sooner = new_debt("Sooner", 100.0, 100.0);
        sooner.deadline = date!(2026 - 10 - 01);
        insert_debt(&conn, "user-1", &later).unwrap();
        insert_debt(&conn, "user-1", &sooner).unwrap();

        let debts = get_debts(&conn, "user-1").unwrap();

        assert_eq!(debts[0].name, "Sooner");
        assert_eq!(debts[1].name, "Later");
    }

    #[test]
    fn validate_rejects_balance_above_total() {
        let result = new_debt("Car Loan", 1000.0, 1200.0).validate();

        assert_eq!(
            result,
            Err(Error::InvalidRange(
                "the current balance cannot exceed the total amount".to_owned()
            ))
        );
    }

    #[test]
    fn validate_rejects_negative_balance() {
        assert!(new_debt("Car Loan", 1000.0, -1.0).validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_name() {
        assert!(new_debt("  ", 1000.0, 500.0).validate().is_err());
    }

    #[test]
    fn validate_accepts_balance_equal_to_total() {
        assert_eq!(Ok(()), new_debt("Car Loan", 1000.0, 1000.0).validate());
    }
}
