//! Defines the endpoint that sets up a new user's ledger.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{AppState, Error, identity::CurrentUser, ledger::operations::ensure_cash_account};

/// The state needed to bootstrap a user's ledger.
#[derive(Debug, Clone)]
pub struct BootstrapState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BootstrapState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that idempotently creates the user's designated
/// cash-on-hand account and returns it.
pub async fn bootstrap_endpoint(
    State(state): State<BootstrapState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let account = ensure_cash_account(&connection, &user_id)?;

    Ok(Json(account))
}
