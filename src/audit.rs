//! Defines the append-only audit trail of balance changes.
//!
//! Every effective balance mutation on an account or debt produces exactly
//! one audit entry linking the previous balance, the new balance and the
//! transaction that caused the change. Entries are never mutated; the only
//! way they are removed is the explicit purge variant of an entity
//! deletion.

use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{DatabaseId, TransactionId, UserId},
    db::{parse_timestamp, timestamp_to_sql},
    transaction::Direction,
};

/// Which kind of entity a balance change applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// An account balance changed.
    Account,
    /// A debt's current balance changed.
    Debt,
}

impl EntityKind {
    /// The tag stored in the database for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Debt => "debt",
        }
    }
}

impl rusqlite::ToSql for EntityKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for EntityKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().and_then(|text| match text {
            "account" => Ok(EntityKind::Account),
            "debt" => Ok(EntityKind::Debt),
            other => Err(FromSqlError::Other(
                format!("unknown entity kind {other:?}").into(),
            )),
        })
    }
}

/// One recorded balance change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// The ID of the entry.
    pub id: DatabaseId,
    /// The ID of the owning user.
    pub user_id: UserId,
    /// The kind of entity whose balance changed.
    pub entity_kind: EntityKind,
    /// The ID of the account or debt.
    pub entity_id: DatabaseId,
    /// The balance before the change.
    pub previous_balance: f64,
    /// The balance after the change.
    pub new_balance: f64,
    /// The applied delta (`new_balance - previous_balance`).
    pub change_amount: f64,
    /// Whether the balance went up or down.
    pub change_type: Direction,
    /// The transaction that caused the change, when one exists.
    pub transaction_id: Option<TransactionId>,
    /// When the change was recorded (server-assigned, UTC).
    pub created_at: OffsetDateTime,
}

/// Create the audit entry table and its index.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_audit_entry_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS audit_entry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            entity_kind TEXT NOT NULL CHECK (entity_kind IN ('account', 'debt')),
            entity_id INTEGER NOT NULL,
            previous_balance REAL NOT NULL,
            new_balance REAL NOT NULL,
            change_amount REAL NOT NULL,
            change_type TEXT NOT NULL,
            transaction_id INTEGER,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_entity
         ON audit_entry(user_id, entity_kind, entity_id)",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [AuditEntry].
pub fn map_row_to_audit_entry(row: &Row) -> Result<AuditEntry, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let entity_kind = row.get(2)?;
    let entity_id = row.get(3)?;
    let previous_balance = row.get(4)?;
    let new_balance = row.get(5)?;
    let change_amount = row.get(6)?;
    let change_type = row.get(7)?;
    let transaction_id = row.get(8)?;
    let created_at = parse_timestamp(row, 9)?;

    Ok(AuditEntry {
        id,
        user_id,
        entity_kind,
        entity_id,
        previous_balance,
        new_balance,
        change_amount,
        change_type,
        transaction_id,
        created_at,
    })
}

const AUDIT_COLUMNS: &str = "id, user_id, entity_kind, entity_id, previous_balance, new_balance, \
                             change_amount, change_type, transaction_id, created_at";

/// Append one audit entry. Only the ledger engine's balance mutator calls
/// this.
pub fn append_audit_entry(
    connection: &Connection,
    user_id: &str,
    entity_kind: EntityKind,
    entity_id: DatabaseId,
    previous_balance: f64,
    new_balance: f64,
    transaction_id: Option<TransactionId>,
) -> Result<AuditEntry, Error> {
    let change_amount = new_balance - previous_balance;
    let change_type = if change_amount >= 0.0 {
        Direction::In
    } else {
        Direction::Out
    };

    let entry = connection
        .prepare(&format!(
            "INSERT INTO audit_entry
                 (user_id, entity_kind, entity_id, previous_balance, new_balance,
                  change_amount, change_type, transaction_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING {AUDIT_COLUMNS}"
        ))?
        .query_row(
            params![
                user_id,
                entity_kind,
                entity_id,
                previous_balance,
                new_balance,
                change_amount,
                change_type,
                transaction_id,
                timestamp_to_sql(OffsetDateTime::now_utc())?,
            ],
            map_row_to_audit_entry,
        )
        .map_err(Error::from)?;

    Ok(entry)
}

/// Retrieve the audit trail for one entity, oldest first.
#[cfg(test)]
pub fn get_audit_entries(
    connection: &Connection,
    user_id: &str,
    entity_kind: EntityKind,
    entity_id: DatabaseId,
) -> Result<Vec<AuditEntry>, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT {AUDIT_COLUMNS} FROM audit_entry
         WHERE user_id = ?1 AND entity_kind = ?2 AND entity_id = ?3
         ORDER BY id ASC"
    ))?;

    let entries = statement
        .query_map(params![user_id, entity_kind, entity_id], map_row_to_audit_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Count all of a user's audit entries.
#[cfg(test)]
pub fn count_audit_entries(connection: &Connection, user_id: &str) -> Result<u32, Error> {
    connection
        .query_one(
            "SELECT COUNT(id) FROM audit_entry WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// Delete the audit trail for one entity. Part of the explicit purge
/// variant of entity deletion; normal flows never remove entries.
///
/// Returns the number of rows removed.
pub fn delete_audit_entries(
    connection: &Connection,
    user_id: &str,
    entity_kind: EntityKind,
    entity_id: DatabaseId,
) -> Result<usize, Error> {
    connection
        .execute(
            "DELETE FROM audit_entry
             WHERE user_id = ?1 AND entity_kind = ?2 AND entity_id = ?3",
            params![user_id, entity_kind, entity_id],
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        audit::{EntityKind, append_audit_entry, count_audit_entries, get_audit_entries},
        db::initialize,
        transaction::Direction,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn append_records_the_delta_and_direction() {
        let conn = get_test_connection();

        let entry =
            append_audit_entry(&conn, "user-1", EntityKind::Account, 1, 100.0, 40.0, Some(9))
                .unwrap();

        assert_eq!(entry.change_amount, -60.0);
        assert_eq!(entry.change_type, Direction::Out);
        assert_eq!(entry.transaction_id, Some(9));
    }

    #[test]
    fn trail_is_returned_oldest_first() {
        let conn = get_test_connection();
        append_audit_entry(&conn, "user-1", EntityKind::Debt, 3, 0.0, 500.0, None).unwrap();
        append_audit_entry(&conn, "user-1", EntityKind::Debt, 3, 500.0, 250.0, None).unwrap();

        let entries = get_audit_entries(&conn, "user-1", EntityKind::Debt, 3).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].new_balance, 500.0);
        assert_eq!(entries[1].new_balance, 250.0);
    }

    #[test]
    fn count_is_scoped_to_user() {
        let conn = get_test_connection();
        append_audit_entry(&conn, "user-1", EntityKind::Account, 1, 0.0, 10.0, None).unwrap();

        assert_eq!(count_audit_entries(&conn, "user-1"), Ok(1));
        assert_eq!(count_audit_entries(&conn, "user-2"), Ok(0));
    }
}
