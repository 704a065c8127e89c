//! Transactions: the immutable history of money movements, each tagged with
//! a direction-specific subrecord.

mod core;
mod deposit_endpoint;
mod list_endpoint;
mod withdraw_endpoint;

pub use core::{
    Direction, IncomeSource, LedgerTransaction, NewLedgerTransaction, PaymentMethod,
    SpendingCategory, Subrecord, create_transaction_table, delete_transactions_for_account,
    delete_transactions_for_debt, get_recent_transactions, insert_transaction, sum_amount_since,
};
#[cfg(test)]
pub use core::get_transaction;
pub use deposit_endpoint::create_deposit_endpoint;
pub use list_endpoint::get_transactions_endpoint;
pub use withdraw_endpoint::create_withdrawal_endpoint;
