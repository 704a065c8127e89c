//! The dashboard: a read-only aggregate view over the ledger.

mod endpoint;
mod summary;

pub use endpoint::get_summary_endpoint;
pub use summary::{Summary, get_summary};
