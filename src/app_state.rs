//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::db::initialize;

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection shared by all endpoints.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState], initializing the database schema.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn new(connection: Connection) -> Result<Self, rusqlite::Error> {
        initialize(&connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(connection)),
        })
    }
}
