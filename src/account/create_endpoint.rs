//! Defines the endpoint for registering a new account.
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
    ledger::operations::{NewAccount, create_account},
};

/// The state needed to create an account.
#[derive(Debug, Clone)]
pub struct CreateAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for registering a new account. Any opening balance is
/// recorded as an initial-deposit transaction in the same commit.
pub async fn create_account_endpoint(
    State(state): State<CreateAccountState>,
    CurrentUser(user_id): CurrentUser,
    Json(new_account): Json<NewAccount>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let account = create_account(&mut connection, &user_id, new_account)?;

    Ok((StatusCode::CREATED, Json(account)))
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
    async fn creates_an_account_with_opening_balance() {
        let server = test_server();

        let response = server
            .post(endpoints::ACCOUNTS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "bank_name": "BDO",
                "name": "Savings",
                "kind": "savings",
                "opening_balance": 2500.0
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let account: Value = response.json();
        assert_eq!(account["name"], "Savings");
        assert_eq!(account["balance"], 2500.0);
    }

    #[tokio::test]
    async fn rejects_a_negative_opening_balance() {
        let server = test_server();

        let response = server
            .post(endpoints::ACCOUNTS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "bank_name": "BDO",
                "name": "Savings",
                "kind": "savings",
                "opening_balance": -1.0
            }))
            .await;

        response.assert_status_bad_request();
    }
}
