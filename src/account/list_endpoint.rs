//! Defines the endpoint for listing a user's accounts.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{AppState, Error, account::get_accounts, identity::CurrentUser};

/// The state needed to list accounts.
#[derive(Debug, Clone)]
pub struct ListAccountsState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListAccountsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that lists the user's accounts, cash account first.
pub async fn get_accounts_endpoint(
    State(state): State<ListAccountsState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let accounts = get_accounts(&connection, &user_id)?;

    Ok(Json(accounts))
}
