//! The ledger use cases: deposit, withdraw, account create/edit/delete and
//! debt create/edit/delete.
//!
//! Each operation is a one-shot transition from one consistent ledger state
//! to another. All writes for one use case share a single database
//! transaction; any error rolls the whole use case back, so a failure never
//! leaves a transaction recorded without its balance update or vice versa.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    account::{
        Account, AccountKind, delete_account_row, get_account, get_cash_account, insert_account,
        update_account_details,
    },
    audit::{EntityKind, delete_audit_entries},
    database_id::{AccountId, DebtId, TransactionId},
    debt::{
        Debt, NewDebt, delete_debt_row, get_debt, grow_debt_total, insert_debt,
        update_debt_fields,
    },
    ledger::{
        mutator::{BalanceTarget, apply_delta},
        recorder::record,
    },
    money::{EPSILON, is_negligible},
    transaction::{
        IncomeSource, NewLedgerTransaction, PaymentMethod, SpendingCategory, Subrecord,
        delete_transactions_for_account, delete_transactions_for_debt,
    },
};

/// How long a loan-created debt gets to be repaid when the user does not
/// say otherwise.
const DEFAULT_LOAN_TERM: Duration = Duration::days(90);

/// The input for recording money in.
#[derive(Debug, Clone, Deserialize)]
pub struct Deposit {
    /// The account receiving the money.
    pub account_id: AccountId,
    /// The amount received.
    pub amount: f64,
    /// What the money was for.
    pub description: String,
    /// Where the money came from.
    pub source: IncomeSource,
    /// The existing debt being borrowed against, for
    /// [IncomeSource::ExistingLoan].
    #[serde(default)]
    pub debt_id: Option<DebtId>,
    /// The name for the debt created by an [IncomeSource::Loan] deposit.
    #[serde(default)]
    pub debt_name: Option<String>,
}

/// What a successful deposit produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositOutcome {
    /// The recorded transaction.
    pub transaction_id: TransactionId,
    /// The account balance after the deposit.
    pub account_balance: f64,
    /// The debt created or grown by a loan deposit, if any.
    pub debt_id: Option<DebtId>,
    /// That debt's remaining balance, if any.
    pub debt_balance: Option<f64>,
}

/// The input for recording money out.
#[derive(Debug, Clone, Deserialize)]
pub struct Withdrawal {
    /// The account the money leaves.
    pub account_id: AccountId,
    /// The amount spent.
    pub amount: f64,
    /// What the money was for.
    pub description: String,
    /// What the money was spent on.
    pub category: SpendingCategory,
    /// The debt being paid down, for [SpendingCategory::DebtPayment].
    #[serde(default)]
    pub debt_id: Option<DebtId>,
}

/// What a successful withdrawal produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalOutcome {
    /// The recorded transaction.
    pub transaction_id: TransactionId,
    /// The account balance after the withdrawal.
    pub account_balance: f64,
    /// The paid debt's remaining balance, when the withdrawal paid one.
    pub debt_balance: Option<f64>,
}

/// The fields for registering an account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    /// The name of the bank or institution.
    pub bank_name: String,
    /// The display name of the account.
    pub name: String,
    /// The kind of account.
    pub kind: AccountKind,
    /// The balance the account starts with. Recorded as an initial-deposit
    /// transaction, not written straight into the row.
    #[serde(default)]
    pub opening_balance: f64,
}

/// The fields for editing an account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountUpdate {
    /// The name of the bank or institution.
    pub bank_name: String,
    /// The display name of the account.
    pub name: String,
    /// The kind of account.
    pub kind: AccountKind,
    /// The balance the account should show. A change from the current
    /// balance synthesizes a balance-adjustment transaction.
    pub balance: f64,
}

/// What deleting an account produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountDeletion {
    /// The synthesized closure transaction, when the account still held
    /// money.
    pub closure_transaction_id: Option<TransactionId>,
}

/// What deleting a debt produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtDeletion {
    /// The synthesized forgiveness transaction, when the debt was still
    /// partly owed.
    pub forgiveness_transaction_id: Option<TransactionId>,
}

/// Idempotently create the user's designated cash-on-hand account.
///
/// Called by the UI once after sign-up; calling it again returns the
/// existing cash account.
pub fn ensure_cash_account(connection: &Connection, user_id: &str) -> Result<Account, Error> {
    if let Some(cash) = get_cash_account(connection, user_id)? {
        return Ok(cash);
    }

    match insert_account(connection, user_id, "Cash", "Cash on Hand", AccountKind::Other, true) {
        Ok(account) => Ok(account),
        // Lost the race against a concurrent bootstrap; the winner's row is
        // the cash account.
        Err(Error::DuplicateCashAccount) => {
            get_cash_account(connection, user_id)?.ok_or(Error::NotFound)
        }
        Err(error) => Err(error),
    }
}

/// Record money coming into an account.
///
/// A deposit with source [IncomeSource::Loan] also creates a debt owing the
/// deposited amount; [IncomeSource::ExistingLoan] grows the selected debt's
/// balance and total by the amount.
///
/// # Errors
/// - [Error::InvalidAmount] when the amount is below one cent,
/// - [Error::EmptyDescription] when the description is blank,
/// - [Error::NotFound] when the account (or selected debt) is not the
///   user's,
/// - [Error::InvalidRange] when an existing-loan deposit names no debt.
pub fn deposit(
    connection: &mut Connection,
    user_id: &str,
    deposit: Deposit,
) -> Result<DepositOutcome, Error> {
    if deposit.amount < EPSILON {
        return Err(Error::InvalidAmount(deposit.amount));
    }
    if deposit.description.trim().is_empty() {
        return Err(Error::EmptyDescription);
    }

    let tx = connection.transaction()?;

    let account = get_account(&tx, user_id, deposit.account_id)?;
    let payment_method = if account.is_cash {
        PaymentMethod::Cash
    } else {
        PaymentMethod::Bank
    };

    let recorded = record(
        &tx,
        user_id,
        NewLedgerTransaction {
            account_id: account.id,
            amount: deposit.amount,
            description: deposit.description.clone(),
            subrecord: Subrecord::MoneyIn {
                source: deposit.source,
                debt_id: deposit.debt_id,
            },
            payment_method,
        },
    )?;

    let account_balance = match apply_delta(
        &tx,
        user_id,
        BalanceTarget::Account(account.id),
        deposit.amount,
        Some(recorded.id),
    )? {
        Some(change) => change.new,
        None => account.balance,
    };

    let (debt_id, debt_balance) = match deposit.source {
        IncomeSource::Loan => {
            let name = match deposit.debt_name {
                Some(ref name) if !name.trim().is_empty() => name.clone(),
                _ => format!("Loan: {}", deposit.description),
            };
            let debt = insert_debt(
                &tx,
                user_id,
                &NewDebt {
                    name,
                    description: deposit.description.clone(),
                    total_amount: deposit.amount,
                    current_balance: deposit.amount,
                    interest_rate: 0.0,
                    deadline: OffsetDateTime::now_utc().date() + DEFAULT_LOAN_TERM,
                    originating_transaction_id: Some(recorded.id),
                },
            )?;

            (Some(debt.id), Some(debt.current_balance))
        }
        IncomeSource::ExistingLoan => {
            let Some(debt_id) = deposit.debt_id else {
                return Err(Error::InvalidRange(
                    "borrowing against an existing loan requires selecting a debt".to_owned(),
                ));
            };

            let change = apply_delta(
                &tx,
                user_id,
                BalanceTarget::Debt(debt_id),
                deposit.amount,
                Some(recorded.id),
            )?;
            grow_debt_total(&tx, user_id, debt_id, deposit.amount)?;

            (Some(debt_id), change.map(|change| change.new))
        }
        _ => (None, None),
    };

    tx.commit()?;

    Ok(DepositOutcome {
        transaction_id: recorded.id,
        account_balance,
        debt_id,
        debt_balance,
    })
}

/// Record money leaving an account.
///
/// A withdrawal with category [SpendingCategory::DebtPayment] and a
/// selected debt also pays that debt down, clamped at zero.
///
/// # Errors
/// - [Error::InvalidAmount] when the amount is below one cent,
/// - [Error::EmptyDescription] when the description is blank,
/// - [Error::InsufficientFunds] when the account holds less than the
///   amount; nothing is written in that case,
/// - [Error::NotFound] when the account (or selected debt) is not the
///   user's.
pub fn withdraw(
    connection: &mut Connection,
    user_id: &str,
    withdrawal: Withdrawal,
) -> Result<WithdrawalOutcome, Error> {
    if withdrawal.amount < EPSILON {
        return Err(Error::InvalidAmount(withdrawal.amount));
    }
    if withdrawal.description.trim().is_empty() {
        return Err(Error::EmptyDescription);
    }

    let tx = connection.transaction()?;

    let account = get_account(&tx, user_id, withdrawal.account_id)?;
    if account.balance + EPSILON < withdrawal.amount {
        return Err(Error::InsufficientFunds {
            available: account.balance,
            requested: withdrawal.amount,
        });
    }

    let payment_method = if account.is_cash {
        PaymentMethod::Cash
    } else {
        PaymentMethod::Bank
    };

    let recorded = record(
        &tx,
        user_id,
        NewLedgerTransaction {
            account_id: account.id,
            amount: withdrawal.amount,
            description: withdrawal.description.clone(),
            subrecord: Subrecord::MoneyOut {
                category: withdrawal.category,
                debt_id: withdrawal.debt_id,
            },
            payment_method,
        },
    )?;

    let account_balance = match apply_delta(
        &tx,
        user_id,
        BalanceTarget::Account(account.id),
        -withdrawal.amount,
        Some(recorded.id),
    )? {
        Some(change) => change.new,
        None => account.balance,
    };

    let debt_balance = match (withdrawal.category, withdrawal.debt_id) {
        (SpendingCategory::DebtPayment, Some(debt_id)) => apply_delta(
            &tx,
            user_id,
            BalanceTarget::Debt(debt_id),
            -withdrawal.amount,
            Some(recorded.id),
        )?
        .map(|change| change.new),
        _ => None,
    };

    tx.commit()?;

    Ok(WithdrawalOutcome {
        transaction_id: recorded.id,
        account_balance,
        debt_balance,
    })
}

/// Register a new account, recording any opening balance as an
/// initial-deposit transaction.
///
/// # Errors
/// Returns [Error::InvalidRange] for a blank name or a negative opening
/// balance.
pub fn create_account(
    connection: &mut Connection,
    user_id: &str,
    new_account: NewAccount,
) -> Result<Account, Error> {
    if new_account.name.trim().is_empty() {
        return Err(Error::InvalidRange("the account name cannot be empty".to_owned()));
    }
    if new_account.opening_balance < 0.0 {
        return Err(Error::InvalidRange(
            "the opening balance cannot be negative".to_owned(),
        ));
    }

    let tx = connection.transaction()?;

    let mut account = insert_account(
        &tx,
        user_id,
        &new_account.bank_name,
        &new_account.name,
        new_account.kind,
        false,
    )?;

    if let Some(new_balance) = reconcile_balance(&tx, user_id, &account, new_account.opening_balance, true)? {
        account.balance = new_balance;
    }

    tx.commit()?;

    Ok(account)
}

/// Edit an account's details, reconciling any balance change through a
/// synthesized adjustment transaction.
pub fn update_account(
    connection: &mut Connection,
    user_id: &str,
    account_id: AccountId,
    update: AccountUpdate,
) -> Result<Account, Error> {
    if update.name.trim().is_empty() {
        return Err(Error::InvalidRange("the account name cannot be empty".to_owned()));
    }

    let tx = connection.transaction()?;

    let account = get_account(&tx, user_id, account_id)?;
    reconcile_balance(&tx, user_id, &account, update.balance, false)?;
    update_account_details(
        &tx,
        user_id,
        account_id,
        &update.bank_name,
        &update.name,
        update.kind,
    )?;

    let account = get_account(&tx, user_id, account_id)?;
    tx.commit()?;

    Ok(account)
}

/// Bring `account`'s balance to `new_balance` by synthesizing an adjustment
/// transaction and applying the difference through the mutator.
///
/// A difference below the currency epsilon writes nothing. Returns the new
/// balance when a change was applied.
fn reconcile_balance(
    connection: &Connection,
    user_id: &str,
    account: &Account,
    new_balance: f64,
    initial: bool,
) -> Result<Option<f64>, Error> {
    let delta = new_balance - account.balance;
    if is_negligible(delta) {
        return Ok(None);
    }

    let (description, payment_method) = if initial {
        (
            format!("Initial balance for {}", account.name),
            PaymentMethod::BankTransfer,
        )
    } else {
        (
            format!("Balance adjustment for {}", account.name),
            PaymentMethod::BalanceAdjustment,
        )
    };

    let subrecord = if delta > 0.0 {
        Subrecord::MoneyIn {
            source: if initial {
                IncomeSource::InitialDeposit
            } else {
                IncomeSource::BalanceAdjustment
            },
            debt_id: None,
        }
    } else {
        Subrecord::MoneyOut {
            category: SpendingCategory::BalanceAdjustment,
            debt_id: None,
        }
    };

    let recorded = record(
        connection,
        user_id,
        NewLedgerTransaction {
            account_id: account.id,
            amount: delta.abs(),
            description,
            subrecord,
            payment_method,
        },
    )?;

    let change = apply_delta(
        connection,
        user_id,
        BalanceTarget::Account(account.id),
        delta,
        Some(recorded.id),
    )?;

    Ok(change.map(|change| change.new))
}

/// Delete an account.
///
/// A remaining balance is recorded as one money-out transaction tagged as
/// an account closure: the money leaves the system with the account, so the
/// balance mutator is not involved. History is retained by default;
/// `purge_history` additionally removes the account's transactions (except
/// the closure record) and audit trail in the same commit.
///
/// # Errors
/// Returns [Error::ProtectedEntity] for the designated cash account, or
/// [Error::NotFound] when the account is not the user's.
pub fn delete_account(
    connection: &mut Connection,
    user_id: &str,
    account_id: AccountId,
    purge_history: bool,
) -> Result<AccountDeletion, Error> {
    let tx = connection.transaction()?;

    let account = get_account(&tx, user_id, account_id)?;
    if account.is_cash {
        return Err(Error::ProtectedEntity);
    }

    let closure_transaction_id = if account.balance >= EPSILON {
        let recorded = record(
            &tx,
            user_id,
            NewLedgerTransaction {
                account_id: account.id,
                amount: account.balance,
                description: format!("Account closure: {}", account.name),
                subrecord: Subrecord::MoneyOut {
                    category: SpendingCategory::AccountClosure,
                    debt_id: None,
                },
                payment_method: PaymentMethod::BalanceAdjustment,
            },
        )?;
        Some(recorded.id)
    } else {
        None
    };

    if purge_history {
        purge_account_history(&tx, user_id, account_id, closure_transaction_id);
    }

    delete_account_row(&tx, user_id, account_id)?;
    tx.commit()?;

    Ok(AccountDeletion {
        closure_transaction_id,
    })
}

/// Create a debt after validating its field ranges.
pub fn create_debt(connection: &Connection, user_id: &str, debt: NewDebt) -> Result<Debt, Error> {
    debt.validate()?;

    insert_debt(connection, user_id, &debt)
}

/// Edit a debt's fields after validating their ranges.
///
/// Manual edits are owner-facing corrections and do not synthesize
/// transactions; balance changes driven by money movement always go through
/// [deposit] and [withdraw].
pub fn update_debt(
    connection: &Connection,
    user_id: &str,
    debt_id: DebtId,
    debt: NewDebt,
) -> Result<Debt, Error> {
    debt.validate()?;

    let rows_affected = update_debt_fields(connection, user_id, debt_id, &debt)?;
    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_debt(connection, user_id, debt_id)
}

/// Delete a debt.
///
/// A remaining balance is forgiven: it is recorded as one money-in
/// transaction against the user's cash account tagged as debt forgiveness.
/// No account balance changes; the forgiven money was never held in an
/// account. History is retained by default; `purge_history` removes the
/// debt's linked transactions (except the forgiveness record) and audit
/// trail in the same commit.
pub fn delete_debt(
    connection: &mut Connection,
    user_id: &str,
    debt_id: DebtId,
    purge_history: bool,
) -> Result<DebtDeletion, Error> {
    let tx = connection.transaction()?;

    let debt = get_debt(&tx, user_id, debt_id)?;

    let forgiveness_transaction_id = if debt.current_balance >= EPSILON {
        let cash = ensure_cash_account(&tx, user_id)?;
        let recorded = record(
            &tx,
            user_id,
            NewLedgerTransaction {
                account_id: cash.id,
                amount: debt.current_balance,
                description: format!("Forgiven debt: {}", debt.name),
                subrecord: Subrecord::MoneyIn {
                    source: IncomeSource::DebtForgiveness,
                    debt_id: Some(debt_id),
                },
                payment_method: PaymentMethod::BalanceAdjustment,
            },
        )?;
        Some(recorded.id)
    } else {
        None
    };

    if purge_history {
        purge_debt_history(&tx, user_id, debt_id, forgiveness_transaction_id);
    }

    delete_debt_row(&tx, user_id, debt_id)?;
    tx.commit()?;

    Ok(DebtDeletion {
        forgiveness_transaction_id,
    })
}

/// Best-effort removal of an account's historical records. Failures are
/// logged and do not fail the deletion itself.
fn purge_account_history(
    connection: &Connection,
    user_id: &str,
    account_id: AccountId,
    keep: Option<TransactionId>,
) {
    match delete_transactions_for_account(connection, user_id, account_id, keep) {
        Ok(removed) => tracing::debug!("purged {removed} transactions for account {account_id}"),
        Err(error) => {
            tracing::warn!("could not purge transactions for account {account_id}: {error}")
        }
    }

    if let Err(error) = delete_audit_entries(connection, user_id, EntityKind::Account, account_id) {
        tracing::warn!("could not purge audit trail for account {account_id}: {error}");
    }
}

/// Best-effort removal of a debt's historical records.
fn purge_debt_history(
    connection: &Connection,
    user_id: &str,
    debt_id: DebtId,
    keep: Option<TransactionId>,
) {
    match delete_transactions_for_debt(connection, user_id, debt_id, keep) {
        Ok(removed) => tracing::debug!("purged {removed} transactions for debt {debt_id}"),
        Err(error) => tracing::warn!("could not purge transactions for debt {debt_id}: {error}"),
    }

    if let Err(error) = delete_audit_entries(connection, user_id, EntityKind::Debt, debt_id) {
        tracing::warn!("could not purge audit trail for debt {debt_id}: {error}");
    }
}
