//! Defines the core data model and database queries for ledger transactions.
//!
//! A transaction records one money movement. The direction-specific detail
//! (income source or spending category, plus an optional debt link) is a
//! tagged union attached to the transaction rather than a separate lookup
//! table, so reading a transaction never needs a join.

use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{AccountId, DebtId, TransactionId, UserId},
    db::{parse_timestamp, timestamp_to_sql},
};

/// Whether money moved into or out of the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Money in.
    In,
    /// Money out.
    Out,
}

impl Direction {
    /// The tag stored in the database for this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl rusqlite::ToSql for Direction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Direction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().and_then(|text| match text {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(FromSqlError::Other(
                format!("unknown direction {other:?}").into(),
            )),
        })
    }
}

/// Where money-in came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeSource {
    /// Salary.
    Salary,
    /// Freelance work.
    Freelance,
    /// Business income.
    Business,
    /// Investment return.
    Investment,
    /// A gift.
    Gift,
    /// A new loan; recording this creates a matching debt.
    Loan,
    /// More borrowed against an existing debt.
    ExistingLoan,
    /// A refund.
    Refund,
    /// The remaining balance of a deleted debt, modeled as income.
    DebtForgiveness,
    /// A synthesized correction when an account balance is edited.
    BalanceAdjustment,
    /// The opening balance of a newly registered account.
    InitialDeposit,
    /// Anything else.
    Other,
}

impl IncomeSource {
    /// The tag stored in the database for this source.
    pub fn as_str(self) -> &'static str {
        match self {
            IncomeSource::Salary => "salary",
            IncomeSource::Freelance => "freelance",
            IncomeSource::Business => "business",
            IncomeSource::Investment => "investment",
            IncomeSource::Gift => "gift",
            IncomeSource::Loan => "loan",
            IncomeSource::ExistingLoan => "existing_loan",
            IncomeSource::Refund => "refund",
            IncomeSource::DebtForgiveness => "debt_forgiveness",
            IncomeSource::BalanceAdjustment => "balance_adjustment",
            IncomeSource::InitialDeposit => "initial_deposit",
            IncomeSource::Other => "other",
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "salary" => Some(IncomeSource::Salary),
            "freelance" => Some(IncomeSource::Freelance),
            "business" => Some(IncomeSource::Business),
            "investment" => Some(IncomeSource::Investment),
            "gift" => Some(IncomeSource::Gift),
            "loan" => Some(IncomeSource::Loan),
            "existing_loan" => Some(IncomeSource::ExistingLoan),
            "refund" => Some(IncomeSource::Refund),
            "debt_forgiveness" => Some(IncomeSource::DebtForgiveness),
            "balance_adjustment" => Some(IncomeSource::BalanceAdjustment),
            "initial_deposit" => Some(IncomeSource::InitialDeposit),
            "other" => Some(IncomeSource::Other),
            _ => None,
        }
    }
}

impl rusqlite::ToSql for IncomeSource {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for IncomeSource {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().and_then(|text| {
            IncomeSource::parse(text)
                .ok_or_else(|| FromSqlError::Other(format!("unknown income source {text:?}").into()))
        })
    }
}

/// What money-out was spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingCategory {
    /// Food and dining.
    Food,
    /// Transportation.
    Transport,
    /// Housing and rent.
    Housing,
    /// Utilities.
    Utilities,
    /// Shopping.
    Shopping,
    /// Entertainment.
    Entertainment,
    /// Health and medical.
    Health,
    /// Education.
    Education,
    /// A payment against a debt; reduces the linked debt's balance.
    DebtPayment,
    /// Savings and investment.
    Savings,
    /// A synthesized correction when an account balance is edited.
    BalanceAdjustment,
    /// The remaining balance of a deleted account, leaving the system.
    AccountClosure,
    /// Anything else.
    Other,
}

impl SpendingCategory {
    /// The tag stored in the database for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            SpendingCategory::Food => "food",
            SpendingCategory::Transport => "transport",
            SpendingCategory::Housing => "housing",
            SpendingCategory::Utilities => "utilities",
            SpendingCategory::Shopping => "shopping",
            SpendingCategory::Entertainment => "entertainment",
            SpendingCategory::Health => "health",
            SpendingCategory::Education => "education",
            SpendingCategory::DebtPayment => "debt_payment",
            SpendingCategory::Savings => "savings",
            SpendingCategory::BalanceAdjustment => "balance_adjustment",
            SpendingCategory::AccountClosure => "account_closure",
            SpendingCategory::Other => "other",
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "food" => Some(SpendingCategory::Food),
            "transport" => Some(SpendingCategory::Transport),
            "housing" => Some(SpendingCategory::Housing),
            "utilities" => Some(SpendingCategory::Utilities),
            "shopping" => Some(SpendingCategory::Shopping),
            "entertainment" => Some(SpendingCategory::Entertainment),
            "health" => Some(SpendingCategory::Health),
            "education" => Some(SpendingCategory::Education),
            "debt_payment" => Some(SpendingCategory::DebtPayment),
            "savings" => Some(SpendingCategory::Savings),
            "balance_adjustment" => Some(SpendingCategory::BalanceAdjustment),
            "account_closure" => Some(SpendingCategory::AccountClosure),
            "other" => Some(SpendingCategory::Other),
            _ => None,
        }
    }
}

impl rusqlite::ToSql for SpendingCategory {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for SpendingCategory {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().and_then(|text| {
            SpendingCategory::parse(text).ok_or_else(|| {
                FromSqlError::Other(format!("unknown spending category {text:?}").into())
            })
        })
    }
}

/// How the money moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash via the cash-on-hand account.
    Cash,
    /// A bank account, e-wallet or card.
    Bank,
    /// A bank transfer; used for opening balances.
    BankTransfer,
    /// No money actually moved; the transaction was synthesized by the
    /// ledger engine (adjustments, closures, forgiveness).
    BalanceAdjustment,
}

impl PaymentMethod {
    /// The tag stored in the database for this method.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Bank => "bank",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::BalanceAdjustment => "balance_adjustment",
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "cash" => Some(PaymentMethod::Cash),
            "bank" => Some(PaymentMethod::Bank),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "balance_adjustment" => Some(PaymentMethod::BalanceAdjustment),
            _ => None,
        }
    }
}

impl rusqlite::ToSql for PaymentMethod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for PaymentMethod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().and_then(|text| {
            PaymentMethod::parse(text).ok_or_else(|| {
                FromSqlError::Other(format!("unknown payment method {text:?}").into())
            })
        })
    }
}

/// The direction-specific detail attached to a transaction.
///
/// Exactly one subrecord exists per transaction; they are created and
/// removed together, never one without the other. Storing the subrecord as
/// columns of the transaction row makes that a structural guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subrecord {
    /// Money-in detail.
    MoneyIn {
        /// Where the money came from.
        source: IncomeSource,
        /// The debt this deposit borrows against, if any.
        debt_id: Option<DebtId>,
    },
    /// Money-out detail.
    MoneyOut {
        /// What the money was spent on.
        category: SpendingCategory,
        /// The debt this payment goes toward, if any.
        debt_id: Option<DebtId>,
    },
}

impl Subrecord {
    /// The direction implied by the subrecord variant.
    pub fn direction(&self) -> Direction {
        match self {
            Subrecord::MoneyIn { .. } => Direction::In,
            Subrecord::MoneyOut { .. } => Direction::Out,
        }
    }

    /// The linked debt, if any.
    pub fn debt_id(&self) -> Option<DebtId> {
        match self {
            Subrecord::MoneyIn { debt_id, .. } | Subrecord::MoneyOut { debt_id, .. } => *debt_id,
        }
    }
}

/// An immutable record of one money movement.
///
/// Transactions are never updated after creation; they are only created, or
/// removed together with their subrecord by the explicit purge variant of
/// an account/debt deletion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerTransaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The ID of the owning user.
    pub user_id: UserId,
    /// The account the money moved into or out of.
    pub account_id: AccountId,
    /// The magnitude of the movement. Always positive; the sign lives in
    /// the subrecord's direction.
    pub amount: f64,
    /// A text description of what the transaction was for. May be empty for
    /// system-synthesized transactions.
    pub description: String,
    /// The direction-specific detail.
    pub subrecord: Subrecord,
    /// How the money moved.
    pub payment_method: PaymentMethod,
    /// When the transaction was recorded (server-assigned, UTC).
    ///
    /// Client clocks are never used, so ordering is consistent across
    /// devices.
    pub created_at: OffsetDateTime,
}

/// The fields needed to record a transaction.
#[derive(Debug, Clone)]
pub struct NewLedgerTransaction {
    /// The account the money moves into or out of.
    pub account_id: AccountId,
    /// The magnitude of the movement. Must be positive.
    pub amount: f64,
    /// A text description of the movement.
    pub description: String,
    /// The direction-specific detail.
    pub subrecord: Subrecord,
    /// How the money moved.
    pub payment_method: PaymentMethod,
}

/// Create the transaction table and its indexes.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS ledger_transaction (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            account_id INTEGER NOT NULL,
            debt_id INTEGER,
            amount REAL NOT NULL CHECK (amount > 0),
            description TEXT NOT NULL DEFAULT '',
            direction TEXT NOT NULL CHECK (direction IN ('in', 'out')),
            source TEXT,
            category TEXT,
            payment_method TEXT NOT NULL,
            created_at TEXT NOT NULL,
            CHECK ((direction = 'in') = (source IS NOT NULL)),
            CHECK ((direction = 'out') = (category IS NOT NULL))
        )",
        (),
    )?;

    // Composite index used by the dashboard's recent/monthly queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_created
         ON ledger_transaction(user_id, created_at)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account
         ON ledger_transaction(account_id)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [LedgerTransaction].
pub fn map_row_to_transaction(row: &Row) -> Result<LedgerTransaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let account_id = row.get(2)?;
    let debt_id: Option<DebtId> = row.get(3)?;
    let amount = row.get(4)?;
    let description = row.get(5)?;
    let direction: Direction = row.get(6)?;
    let source: Option<IncomeSource> = row.get(7)?;
    let category: Option<SpendingCategory> = row.get(8)?;
    let payment_method = row.get(9)?;
    let created_at = parse_timestamp(row, 10)?;

    let subrecord = match (direction, source, category) {
        (Direction::In, Some(source), _) => Subrecord::MoneyIn { source, debt_id },
        (Direction::Out, _, Some(category)) => Subrecord::MoneyOut { category, debt_id },
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                6,
                Type::Text,
                "transaction row is missing its subrecord tag".into(),
            ));
        }
    };

    Ok(LedgerTransaction {
        id,
        user_id,
        account_id,
        amount,
        description,
        subrecord,
        payment_method,
        created_at,
    })
}

const TRANSACTION_COLUMNS: &str = "id, user_id, account_id, debt_id, amount, description, \
                                   direction, source, category, payment_method, created_at";

/// Insert a transaction row with its embedded subrecord.
///
/// Callers go through the ledger engine's recorder, which validates the
/// amount; the schema additionally rejects non-positive amounts.
pub fn insert_transaction(
    connection: &Connection,
    user_id: &str,
    transaction: &NewLedgerTransaction,
) -> Result<LedgerTransaction, Error> {
    let (source, category) = match transaction.subrecord {
        Subrecord::MoneyIn { source, .. } => (Some(source), None),
        Subrecord::MoneyOut { category, .. } => (None, Some(category)),
    };

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO ledger_transaction
                 (user_id, account_id, debt_id, amount, description, direction,
                  source, category, payment_method, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            params![
                user_id,
                transaction.account_id,
                transaction.subrecord.debt_id(),
                transaction.amount,
                transaction.description,
                transaction.subrecord.direction(),
                source,
                category,
                transaction.payment_method,
                timestamp_to_sql(OffsetDateTime::now_utc())?,
            ],
            map_row_to_transaction,
        )
        .map_err(Error::from)?;

    Ok(transaction)
}

/// Retrieve a transaction by id, scoped to its owner.
#[cfg(test)]
pub fn get_transaction(
    connection: &Connection,
    user_id: &str,
    id: TransactionId,
) -> Result<LedgerTransaction, Error> {
    connection
        .query_one(
            &format!(
                "SELECT {TRANSACTION_COLUMNS} FROM ledger_transaction
                 WHERE id = ?1 AND user_id = ?2"
            ),
            params![id, user_id],
            map_row_to_transaction,
        )
        .map_err(Error::from)
}

/// Retrieve a user's most recent transactions, newest first.
pub fn get_recent_transactions(
    connection: &Connection,
    user_id: &str,
    limit: u32,
) -> Result<Vec<LedgerTransaction>, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM ledger_transaction
         WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    ))?;

    let transactions = statement
        .query_map(params![user_id, limit], map_row_to_transaction)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

/// Sum the amounts of a user's transactions in one direction recorded at or
/// after `since` (an RFC 3339 timestamp as produced by the storage layer).
pub fn sum_amount_since(
    connection: &Connection,
    user_id: &str,
    direction: Direction,
    since: &str,
) -> Result<f64, Error> {
    connection
        .query_one(
            "SELECT COALESCE(SUM(amount), 0) FROM ledger_transaction
             WHERE user_id = ?1 AND direction = ?2 AND created_at >= ?3",
            params![user_id, direction, since],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// Delete a user's transactions for one account, optionally keeping one row
/// (the just-synthesized closure transaction survives a purge).
///
/// Returns the number of rows removed.
pub fn delete_transactions_for_account(
    connection: &Connection,
    user_id: &str,
    account_id: AccountId,
    keep: Option<TransactionId>,
) -> Result<usize, Error> {
    connection
        .execute(
            "DELETE FROM ledger_transaction
             WHERE user_id = ?1 AND account_id = ?2 AND id != COALESCE(?3, -1)",
            params![user_id, account_id, keep],
        )
        .map_err(Error::from)
}

/// Delete a user's transactions linked to one debt, optionally keeping one
/// row. Returns the number of rows removed.
pub fn delete_transactions_for_debt(
    connection: &Connection,
    user_id: &str,
    debt_id: DebtId,
    keep: Option<TransactionId>,
) -> Result<usize, Error> {
    connection
        .execute(
            "DELETE FROM ledger_transaction
             WHERE user_id = ?1 AND debt_id = ?2 AND id != COALESCE(?3, -1)",
            params![user_id, debt_id, keep],
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        transaction::core::{
            Direction, IncomeSource, NewLedgerTransaction, PaymentMethod, SpendingCategory,
            Subrecord, get_recent_transactions, get_transaction, insert_transaction,
            sum_amount_since,
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn money_in(amount: f64, source: IncomeSource) -> NewLedgerTransaction {
        NewLedgerTransaction {
            account_id: 1,
            amount,
            description: "test".to_owned(),
            subrecord: Subrecord::MoneyIn {
                source,
                debt_id: None,
            },
            payment_method: PaymentMethod::Cash,
        }
    }

    fn money_out(amount: f64, category: SpendingCategory) -> NewLedgerTransaction {
        NewLedgerTransaction {
            account_id: 1,
            amount,
            description: "test".to_owned(),
            subrecord: Subrecord::MoneyOut {
                category,
                debt_id: Some(7),
            },
            payment_method: PaymentMethod::Bank,
        }
    }

    #[test]
    fn money_in_round_trips() {
        let conn = get_test_connection();

        let created =
            insert_transaction(&conn, "user-1", &money_in(5000.0, IncomeSource::Salary)).unwrap();

        let got = get_transaction(&conn, "user-1", created.id).unwrap();
        assert_eq!(created, got);
        assert_eq!(
            got.subrecord,
            Subrecord::MoneyIn {
                source: IncomeSource::Salary,
                debt_id: None
            }
        );
    }

    #[test]
    fn money_out_round_trips_with_debt_link() {
        let conn = get_test_connection();

        let created = insert_transaction(
            &conn,
            "user-1",
            &money_out(1200.0, SpendingCategory::DebtPayment),
        )
        .unwrap();

        let got = get_transaction(&conn, "user-1", created.id).unwrap();
        assert_eq!(got.subrecord.debt_id(), Some(7));
        assert_eq!(got.subrecord.direction(), Direction::Out);
    }

    #[test]
    fn recent_transactions_are_newest_first() {
        let conn = get_test_connection();
        for amount in [1.0, 2.0, 3.0] {
            insert_transaction(&conn, "user-1", &money_in(amount, IncomeSource::Other)).unwrap();
        }

        let recent = get_recent_transactions(&conn, "user-1", 2).unwrap();

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].amount, 3.0);
        assert_eq!(recent[1].amount, 2.0);
    }

    #[test]
    fn sums_are_partitioned_by_direction() {
        let conn = get_test_connection();
        insert_transaction(&conn, "user-1", &money_in(100.0, IncomeSource::Salary)).unwrap();
        insert_transaction(&conn, "user-1", &money_in(50.0, IncomeSource::Gift)).unwrap();
        insert_transaction(&conn, "user-1", &money_out(30.0, SpendingCategory::Food)).unwrap();

        let total_in = sum_amount_since(&conn, "user-1", Direction::In, "2000-01-01T00:00:00Z");
        let total_out = sum_amount_since(&conn, "user-1", Direction::Out, "2000-01-01T00:00:00Z");

        assert_eq!(total_in, Ok(150.0));
        assert_eq!(total_out, Ok(30.0));
    }

    #[test]
    fn sums_are_zero_for_unknown_user() {
        let conn = get_test_connection();

        let total = sum_amount_since(&conn, "nobody", Direction::In, "2000-01-01T00:00:00Z");

        assert_eq!(total, Ok(0.0));
    }
}
