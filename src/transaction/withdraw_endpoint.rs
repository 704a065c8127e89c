//! Defines the endpoint for recording money out.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    identity::CurrentUser,
    ledger::operations::{Withdrawal, withdraw},
};

/// The state needed to record a withdrawal.
#[derive(Debug, Clone)]
pub struct WithdrawalState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for WithdrawalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for recording money leaving an account. Debt payments
/// also pay the selected debt down in the same commit.
pub async fn create_withdrawal_endpoint(
    State(state): State<WithdrawalState>,
    CurrentUser(user_id): CurrentUser,
    Json(new_withdrawal): Json<Withdrawal>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let outcome = withdraw(&mut connection, &user_id, new_withdrawal)?;

    Ok((StatusCode::CREATED, Json(outcome)))
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

    async fn funded_cash_account(server: &TestServer, amount: f64) -> i64 {
        let response = server
            .post(endpoints::BOOTSTRAP)
            .add_header(USER_ID_HEADER, "user-1")
            .await;
        let account: Value = response.json();
        let account_id = account["id"].as_i64().unwrap();

        server
            .post(endpoints::DEPOSITS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "account_id": account_id,
                "amount": amount,
                "description": "Salary",
                "source": "salary"
            }))
            .await;

        account_id
    }

    #[tokio::test]
    async fn records_a_withdrawal() {
        let server = test_server();
        let account_id = funded_cash_account(&server, 3000.0).await;

        let response = server
            .post(endpoints::WITHDRAWALS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "account_id": account_id,
                "amount": 2000.0,
                "description": "Rent",
                "category": "housing"
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let outcome: Value = response.json();
        assert_eq!(outcome["account_balance"], 1000.0);
    }

    #[tokio::test]
    async fn overdraw_is_a_conflict() {
        let server = test_server();
        let account_id = funded_cash_account(&server, 100.0).await;

        let response = server
            .post(endpoints::WITHDRAWALS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "account_id": account_id,
                "amount": 500.0,
                "description": "Rent",
                "category": "housing"
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "insufficient_funds");
    }
}
