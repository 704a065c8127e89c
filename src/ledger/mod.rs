//! The ledger consistency engine.
//!
//! Three layers cooperate to keep accounts, debts, transaction history and
//! the audit trail mutually consistent:
//!
//! - [mutator] applies signed deltas to running balances and appends audit
//!   entries,
//! - [recorder] writes the immutable transaction + subrecord narrative,
//! - [operations] sequences the two inside a single database transaction
//!   per use case, so every money movement either fully commits or leaves
//!   the ledger untouched.

pub mod mutator;
pub mod operations;
pub mod recorder;
