//! Defines the endpoint for deleting a debt.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, database_id::DebtId, identity::CurrentUser, ledger::operations::delete_debt,
};

/// The state needed to delete a debt.
#[derive(Debug, Clone)]
pub struct DeleteDebtState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteDebtState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Whether the deletion should also remove the debt's history.
#[derive(Debug, Default, Deserialize)]
pub struct PurgeParams {
    /// Remove the debt's linked transactions and audit trail too.
    #[serde(default)]
    pub purge: bool,
}

/// A route handler for deleting a debt. A remaining balance is forgiven
/// with a money-in record against the cash account before the row goes.
pub async fn delete_debt_endpoint(
    State(state): State<DeleteDebtState>,
    CurrentUser(user_id): CurrentUser,
    Path(debt_id): Path<DebtId>,
    Query(params): Query<PurgeParams>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let deletion = delete_debt(&mut connection, &user_id, debt_id, params.purge)?;

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
    async fn deleting_an_owed_debt_forgives_it() {
        let server = test_server();
        let created = server
            .post(endpoints::DEBTS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "name": "Old debt",
                "total_amount": 500.0,
                "current_balance": 500.0,
                "deadline": "2026-12-31"
            }))
            .await;
        let debt: Value = created.json();

        let response = server
            .delete(&format!("/api/debts/{}", debt["id"]))
            .add_header(USER_ID_HEADER, "user-1")
            .await;

        response.assert_status_ok();
        let deletion: Value = response.json();
        assert!(deletion["forgiveness_transaction_id"].is_i64());

        let debts = server
            .get(endpoints::DEBTS)
            .add_header(USER_ID_HEADER, "user-1")
            .await;
        let debts: Vec<Value> = debts.json();
        assert!(debts.is_empty());
    }

    #[tokio::test]
    async fn deleting_an_unknown_debt_is_not_found() {
        let server = test_server();

        let response = server
            .delete("/api/debts/999")
            .add_header(USER_ID_HEADER, "user-1")
            .await;

        response.assert_status_not_found();
    }
}
