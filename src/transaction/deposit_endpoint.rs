//! Defines the endpoint for recording money in.
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
    ledger::operations::{Deposit, deposit},
};

/// The state needed to record a deposit.
#[derive(Debug, Clone)]
pub struct DepositState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DepositState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for recording money coming into an account. Loan sources
/// also create or grow the matching debt in the same commit.
pub async fn create_deposit_endpoint(
    State(state): State<DepositState>,
    CurrentUser(user_id): CurrentUser,
    Json(new_deposit): Json<Deposit>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let outcome = deposit(&mut connection, &user_id, new_deposit)?;

    Ok((StatusCode::CREATED, Json(outcome)))
}
