//! The API endpoint URIs.

/// The route for creating the user's designated cash account after sign-up.
pub const BOOTSTRAP: &str = "/api/bootstrap";
/// The route to list and create accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to update or delete one account.
pub const ACCOUNT: &str = "/api/accounts/{account_id}";
/// The route to list and create debts.
pub const DEBTS: &str = "/api/debts";
/// The route to update or delete one debt.
pub const DEBT: &str = "/api/debts/{debt_id}";
/// The route for recording money in.
pub const DEPOSITS: &str = "/api/deposits";
/// The route for recording money out.
pub const WITHDRAWALS: &str = "/api/withdrawals";
/// The route to list recent transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for the dashboard summary.
pub const SUMMARY: &str = "/api/summary";
