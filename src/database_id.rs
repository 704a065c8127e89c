//! ID type definitions for the domain models.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of an account row.
pub type AccountId = DatabaseId;
/// The ID of a debt row.
pub type DebtId = DatabaseId;
/// The ID of a ledger transaction row.
pub type TransactionId = DatabaseId;

/// The opaque user id issued by the external identity provider.
///
/// There is no local user table; every entity carries the owning user's id
/// as a foreign key into the identity provider's namespace.
pub type UserId = String;
