//! Defines the endpoint for editing a debt.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error, database_id::DebtId, debt::NewDebt, identity::CurrentUser,
    ledger::operations::update_debt,
};

/// The state needed to edit a debt.
#[derive(Debug, Clone)]
pub struct EditDebtState {
    /// The database connection for managing debts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditDebtState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for manually correcting a debt's fields. Edits here do
/// not synthesize transactions; money movement goes through deposits and
/// withdrawals.
pub async fn edit_debt_endpoint(
    State(state): State<EditDebtState>,
    CurrentUser(user_id): CurrentUser,
    Path(debt_id): Path<DebtId>,
    Json(debt): Json<NewDebt>,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let debt = update_debt(&connection, &user_id, debt_id, debt)?;

    Ok(Json(debt))
}
