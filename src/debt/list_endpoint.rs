//! Defines the endpoint for listing a user's debts.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{AppState, Error, debt::get_debts, identity::CurrentUser};

/// The state needed to list debts.
#[derive(Debug, Clone)]
pub struct ListDebtsState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListDebtsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that lists the user's debts, nearest deadline first.
pub async fn get_debts_endpoint(
    State(state): State<ListDebtsState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let debts = get_debts(&connection, &user_id)?;

    Ok(Json(debts))
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
    async fn lists_debts_nearest_deadline_first() {
        let server = test_server();
        for (name, deadline) in [("Later", "2027-06-30"), ("Sooner", "2026-10-01")] {
            server
                .post(endpoints::DEBTS)
                .add_header(USER_ID_HEADER, "user-1")
                .json(&json!({
                    "name": name,
                    "total_amount": 100.0,
                    "current_balance": 100.0,
                    "deadline": deadline
                }))
                .await;
        }

        let response = server
            .get(endpoints::DEBTS)
            .add_header(USER_ID_HEADER, "user-1")
            .await;

        response.assert_status_ok();
        let debts: Vec<Value> = response.json();
        assert_eq!(debts.len(), 2);
        assert_eq!(debts[0]["name"], "Sooner");
    }
}
