//! Defines the endpoint for the dashboard summary.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{AppState, Error, dashboard::get_summary, identity::CurrentUser};

/// The state needed for the dashboard summary.
#[derive(Debug, Clone)]
pub struct SummaryState {
    /// The database connection for reading the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SummaryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for the dashboard summary. Read-only.
pub async fn get_summary_endpoint(
    State(state): State<SummaryState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let summary = get_summary(&connection, &user_id)?;

    Ok(Json(summary))
}
