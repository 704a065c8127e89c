//! Debts: money the user owes, tracked separately from account balances.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use core::{
    Debt, NewDebt, create_debt_table, delete_debt_row, get_debt, get_debts, grow_debt_total,
    insert_debt, update_debt_fields,
};
pub use create_endpoint::create_debt_endpoint;
pub use delete_endpoint::delete_debt_endpoint;
pub use edit_endpoint::edit_debt_endpoint;
pub use list_endpoint::get_debts_endpoint;
