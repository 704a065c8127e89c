//! Defines the endpoint for creating a debt.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{AppState, Error, debt::NewDebt, identity::CurrentUser, ledger::operations::create_debt};

/// The state needed to create a debt.
#[derive(Debug, Clone)]
pub struct CreateDebtState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateDebtState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a debt the user tracks manually.
pub async fn create_debt_endpoint(
    State(state): State<CreateDebtState>,
    CurrentUser(user_id): CurrentUser,
    Json(new_debt): Json<NewDebt>,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let debt = create_debt(&connection, &user_id, new_debt)?;

    Ok((StatusCode::CREATED, Json(debt)))
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
    async fn creates_a_debt() {
        let server = test_server();

        let response = server
            .post(endpoints::DEBTS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "name": "Car Loan",
                "total_amount": 10000.0,
                "current_balance": 10000.0,
                "deadline": "2026-12-31"
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let debt: Value = response.json();
        assert_eq!(debt["name"], "Car Loan");
        assert_eq!(debt["current_balance"], 10000.0);
    }

    #[tokio::test]
    async fn rejects_a_balance_above_the_total() {
        let server = test_server();

        let response = server
            .post(endpoints::DEBTS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "name": "Car Loan",
                "total_amount": 1000.0,
                "current_balance": 1500.0,
                "deadline": "2026-12-31"
            }))
            .await;

        response.assert_status_bad_request();
    }
}
