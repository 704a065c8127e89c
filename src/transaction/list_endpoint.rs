//! Defines the endpoint for listing recent transactions.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{AppState, Error, identity::CurrentUser, transaction::get_recent_transactions};

/// How many transactions to return when the client does not say.
const DEFAULT_LIMIT: u32 = 50;

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// The maximum number of transactions to return.
    pub limit: Option<u32>,
}

/// A route handler that lists the user's transactions, newest first.
pub async fn get_transactions_endpoint(
    State(state): State<ListTransactionsState>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let transactions = get_recent_transactions(&connection, &user_id, limit)?;

    Ok(Json(transactions))
}
