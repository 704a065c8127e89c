//! The balance mutator: applies signed deltas to account and debt balances.

use rusqlite::{Connection, params};

use crate::{
    Error,
    audit::{EntityKind, append_audit_entry},
    database_id::{AccountId, DebtId, TransactionId},
    money::{approx_eq, is_negligible},
};

/// Which balance a delta applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceTarget {
    /// An account's running balance.
    Account(AccountId),
    /// A debt's remaining balance.
    Debt(DebtId),
}

/// The result of applying a delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceChange {
    /// The balance before the delta.
    pub previous: f64,
    /// The balance after the delta (after clamping, for debts).
    pub new: f64,
}

/// Apply a signed delta to a balance and append one audit entry.
///
/// The update is issued as a single atomic increment statement, never a
/// read followed by a write, so two operations racing on the same entity
/// cannot lose an update.
///
/// Account balances may go negative (withdrawal callers check sufficiency
/// first); debt balances are clamped at a floor of zero. A delta smaller
/// than the currency epsilon is treated as floating point noise: nothing is
/// mutated, nothing is recorded, and `None` is returned. A delta entirely
/// absorbed by the zero clamp is reported the same way; the balance did not
/// change, so no audit entry is appended.
///
/// # Errors
/// Returns [Error::NotFound] if the target does not refer to an entity
/// owned by `user_id`, or [Error::Sql] for any other SQL error.
pub fn apply_delta(
    connection: &Connection,
    user_id: &str,
    target: BalanceTarget,
    delta: f64,
    transaction_id: Option<TransactionId>,
) -> Result<Option<BalanceChange>, Error> {
    if is_negligible(delta) {
        return Ok(None);
    }

    let (entity_kind, entity_id, change) = match target {
        BalanceTarget::Account(id) => {
            let new: f64 = connection
                .prepare(
                    "UPDATE account SET balance = balance + ?1
                     WHERE id = ?2 AND user_id = ?3
                     RETURNING balance",
                )?
                .query_row(params![delta, id, user_id], |row| row.get(0))
                .map_err(Error::from)?;

            (
                EntityKind::Account,
                id,
                BalanceChange {
                    previous: new - delta,
                    new,
                },
            )
        }
        BalanceTarget::Debt(id) => {
            let unclamped: f64 = connection
                .prepare(
                    "UPDATE debt SET current_balance = current_balance + ?1
                     WHERE id = ?2 AND user_id = ?3
                     RETURNING current_balance",
                )?
                .query_row(params![delta, id, user_id], |row| row.get(0))
                .map_err(Error::from)?;

            // A debt is never owed backwards; overpayment settles it at zero.
            let new = if unclamped < 0.0 {
                connection.execute(
                    "UPDATE debt SET current_balance = 0 WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                )?;
                0.0
            } else {
                unclamped
            };

            (
                EntityKind::Debt,
                id,
                BalanceChange {
                    previous: unclamped - delta,
                    new,
                },
            )
        }
    };

    if approx_eq(change.previous, change.new) {
        return Ok(None);
    }

    append_audit_entry(
        connection,
        user_id,
        entity_kind,
        entity_id,
        change.previous,
        change.new,
        transaction_id,
    )?;

    Ok(Some(change))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        account::{AccountKind, get_account, insert_account},
        audit::{EntityKind, count_audit_entries, get_audit_entries},
        db::initialize,
        debt::{NewDebt, get_debt, insert_debt},
        ledger::mutator::{BalanceChange, BalanceTarget, apply_delta},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn test_account(conn: &Connection) -> i64 {
        insert_account(conn, "user-1", "BDO", "Salary", AccountKind::Savings, false)
            .unwrap()
            .id
    }

    fn test_debt(conn: &Connection, current: f64) -> i64 {
        insert_debt(
            conn,
            "user-1",
            &NewDebt {
                name: "Car Loan".to_owned(),
                description: String::new(),
                total_amount: current.max(1.0),
                current_balance: current,
                interest_rate: 0.0,
                deadline: date!(2026 - 12 - 31),
                originating_transaction_id: None,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn positive_delta_raises_account_balance() {
        let conn = get_test_connection();
        let account_id = test_account(&conn);

        let change = apply_delta(
            &conn,
            "user-1",
            BalanceTarget::Account(account_id),
            5000.0,
            None,
        )
        .unwrap();

        assert_eq!(
            change,
            Some(BalanceChange {
                previous: 0.0,
                new: 5000.0
            })
        );
        assert_eq!(
            get_account(&conn, "user-1", account_id).unwrap().balance,
            5000.0
        );
    }

    #[test]
    fn account_balance_may_go_negative() {
        let conn = get_test_connection();
        let account_id = test_account(&conn);

        let change = apply_delta(
            &conn,
            "user-1",
            BalanceTarget::Account(account_id),
            -250.0,
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(change.new, -250.0);
    }

    #[test]
    fn debt_balance_clamps_at_zero() {
        let conn = get_test_connection();
        let debt_id = test_debt(&conn, 1000.0);

        let change = apply_delta(&conn, "user-1", BalanceTarget::Debt(debt_id), -1200.0, None)
            .unwrap()
            .unwrap();

        assert_eq!(change.previous, 1000.0);
        assert_eq!(change.new, 0.0);
        assert_eq!(
            get_debt(&conn, "user-1", debt_id).unwrap().current_balance,
            0.0
        );
    }

    #[test]
    fn payment_against_a_settled_debt_records_nothing() {
        let conn = get_test_connection();
        let debt_id = test_debt(&conn, 0.0);

        let change = apply_delta(&conn, "user-1", BalanceTarget::Debt(debt_id), -100.0, None)
            .unwrap();

        assert_eq!(change, None);
        assert_eq!(
            get_debt(&conn, "user-1", debt_id).unwrap().current_balance,
            0.0
        );
        assert_eq!(count_audit_entries(&conn, "user-1"), Ok(0));
    }

    #[test]
    fn negligible_delta_mutates_and_records_nothing() {
        let conn = get_test_connection();
        let account_id = test_account(&conn);

        let change = apply_delta(
            &conn,
            "user-1",
            BalanceTarget::Account(account_id),
            0.005,
            None,
        )
        .unwrap();

        assert_eq!(change, None);
        assert_eq!(
            get_account(&conn, "user-1", account_id).unwrap().balance,
            0.0
        );
        assert_eq!(count_audit_entries(&conn, "user-1"), Ok(0));
    }

    #[test]
    fn each_effective_delta_appends_one_audit_entry() {
        let conn = get_test_connection();
        let account_id = test_account(&conn);

        apply_delta(
            &conn,
            "user-1",
            BalanceTarget::Account(account_id),
            100.0,
            Some(42),
        )
        .unwrap();
        apply_delta(
            &conn,
            "user-1",
            BalanceTarget::Account(account_id),
            -40.0,
            None,
        )
        .unwrap();

        let entries =
            get_audit_entries(&conn, "user-1", EntityKind::Account, account_id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].transaction_id, Some(42));
        assert_eq!(entries[1].previous_balance, 100.0);
        assert_eq!(entries[1].new_balance, 60.0);
    }

    #[test]
    fn unknown_target_is_not_found() {
        let conn = get_test_connection();

        let result = apply_delta(&conn, "user-1", BalanceTarget::Account(999), 10.0, None);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn target_is_scoped_to_owner() {
        let conn = get_test_connection();
        let account_id = test_account(&conn);

        let result = apply_delta(
            &conn,
            "someone-else",
            BalanceTarget::Account(account_id),
            10.0,
            None,
        );

        assert_eq!(result, Err(Error::NotFound));
    }
}
