//! Defines the endpoint for editing an account.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    database_id::AccountId,
    identity::CurrentUser,
    ledger::operations::{AccountUpdate, update_account},
};

/// The state needed to edit an account.
#[derive(Debug, Clone)]
pub struct EditAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for editing an account's details. A balance change is
/// reconciled through a synthesized adjustment transaction, never written
/// straight onto the row.
pub async fn edit_account_endpoint(
    State(state): State<EditAccountState>,
    CurrentUser(user_id): CurrentUser,
    Path(account_id): Path<AccountId>,
    Json(update): Json<AccountUpdate>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let account = update_account(&mut connection, &user_id, account_id, update)?;

    Ok(Json(account))
}
