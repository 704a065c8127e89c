//! Accounts: the places a user's money sits, including the designated
//! cash-on-hand account.

mod bootstrap_endpoint;
mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use bootstrap_endpoint::bootstrap_endpoint;
pub use core::{
    Account, AccountKind, create_account_table, delete_account_row, get_account, get_accounts,
    get_cash_account, insert_account, update_account_details,
};
pub use create_endpoint::create_account_endpoint;
pub use delete_endpoint::delete_account_endpoint;
pub use edit_endpoint::edit_account_endpoint;
pub use list_endpoint::get_accounts_endpoint;
