//! Defines the endpoint for deleting an account.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, database_id::AccountId, identity::CurrentUser,
    ledger::operations::delete_account,
};

/// The state needed to delete an account.
#[derive(Debug, Clone)]
pub struct DeleteAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Whether a deletion should also remove the entity's history.
#[derive(Debug, Default, Deserialize)]
pub struct PurgeParams {
    /// Remove the entity's transactions and audit trail too. History is
    /// retained by default.
    #[serde(default)]
    pub purge: bool,
}

/// A route handler for deleting an account. A remaining balance is recorded
/// as a closure transaction before the row goes.
pub async fn delete_account_endpoint(
    State(state): State<DeleteAccountState>,
    CurrentUser(user_id): CurrentUser,
    Path(account_id): Path<AccountId>,
    Query(params): Query<PurgeParams>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let deletion = delete_account(&mut connection, &user_id, account_id, params.purge)?;

    Ok(Json(deletion))
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, build_router, endpoints, identity::USER_ID_HEADER};

    fn test_server() -> TestServer {
        let state = AppState::new(Connection::open_in_memory().unwrap()).unwrap();
        TestServer::new(build_router(state)).unwrap()
    }

    #[tokio::test]
    async fn deleting_an_account_records_a_closure() {
        let server = test_server();
        let created = server
            .post(endpoints::ACCOUNTS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "bank_name": "BDO",
                "name": "Old savings",
                "kind": "savings",
                "opening_balance": 150.0
            }))
            .await;
        let account: Value = created.json();

        let response = server
            .delete(&format!("/api/accounts/{}", account["id"]))
            .add_header(USER_ID_HEADER, "user-1")
            .await;

        response.assert_status_ok();
        let deletion: Value = response.json();
        assert!(deletion["closure_transaction_id"].is_i64());

        let accounts = server
            .get(endpoints::ACCOUNTS)
            .add_header(USER_ID_HEADER, "user-1")
            .await;
        let accounts: Vec<Value> = accounts.json();
        assert!(accounts.is_empty());
    }

    #[tokio::test]
    async fn the_cash_account_is_protected() {
        let server = test_server();
        let cash = server
            .post(endpoints::BOOTSTRAP)
            .add_header(USER_ID_HEADER, "user-1")
            .await;
        let cash: Value = cash.json();

        let response = server
            .delete(&format!("/api/accounts/{}", cash["id"]))
            .add_header(USER_ID_HEADER, "user-1")
            .await;

        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn purge_removes_the_history_too() {
        let server = test_server();
        let created = server
            .post(endpoints::ACCOUNTS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "bank_name": "BDO",
                "name": "Old savings",
                "kind": "savings",
                "opening_balance": 500.0
            }))
            .await;
        let account: Value = created.json();

        let response = server
            .delete(&format!("/api/accounts/{}?purge=true", account["id"]))
            .add_header(USER_ID_HEADER, "user-1")
            .await;
        response.assert_status_ok();

        let transactions = server
            .get(endpoints::TRANSACTIONS)
            .add_header(USER_ID_HEADER, "user-1")
            .await;
        let transactions: Vec<Value> = transactions.json();
        // Only the closure record survives a purge.
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0]["amount"], 500.0);
    }
}
