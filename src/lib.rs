//! Money Monitor is a small web service for tracking personal finances:
//! bank/cash accounts, money-in and money-out transactions, and debts.
//!
//! The heart of the crate is the ledger engine ([`ledger`]): every money
//! movement writes a transaction record, applies a delta to the running
//! balance of an account (and optionally a debt), and appends an audit
//! entry, all inside a single database transaction so the ledger can never
//! be left half-updated.
//!
//! This library provides a JSON API over that engine. Identity is handled
//! by an upstream auth proxy; handlers receive the authenticated user id
//! with each request and thread it through every operation explicitly.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod app_state;
mod audit;
mod dashboard;
mod database_id;
mod db;
mod debt;
mod endpoints;
mod identity;
mod ledger;
mod money;
mod routing;
mod transaction;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use identity::{CurrentUser, USER_ID_HEADER};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request did not carry an authenticated user id.
    #[error("the request is not authenticated")]
    Unauthenticated,

    /// The requested entity could not be found, or is not owned by the
    /// requesting user.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A transaction amount was zero or negative.
    ///
    /// Transactions record the magnitude of a money movement; the direction
    /// is carried separately, so the amount must always be positive.
    #[error("{0} is not a valid transaction amount, the amount must be positive")]
    InvalidAmount(f64),

    /// A user-entered transaction was submitted with a blank description.
    ///
    /// Only system-synthesized transactions (balance adjustments, closures,
    /// forgiveness) may omit the description.
    #[error("the transaction description cannot be empty")]
    EmptyDescription,

    /// A withdrawal was requested for more money than the account holds.
    #[error("insufficient funds: the account holds {available} but {requested} was requested")]
    InsufficientFunds {
        /// The balance of the account at the time of the request.
        available: f64,
        /// The amount the caller tried to withdraw.
        requested: f64,
    },

    /// A field failed range validation, e.g. a debt balance exceeding the
    /// debt's total amount or a negative opening balance.
    #[error("{0}")]
    InvalidRange(String),

    /// An attempt was made to delete the user's designated cash account.
    #[error("the cash account cannot be deleted")]
    ProtectedEntity,

    /// An attempt was made to create a second cash account for a user.
    #[error("the user already has a cash account")]
    DuplicateCashAccount,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    ///
    /// A failed commit never leaves partial writes behind, so callers may
    /// safely retry the whole use case.
    #[error("an unexpected SQL error occurred: {0}")]
    Sql(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("account_cash_unique") =>
            {
                Error::DuplicateCashAccount
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => Error::Sql(error),
        }
    }
}

impl Error {
    /// A stable machine-readable tag for the error, sent to API clients.
    fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::NotFound => "not_found",
            Error::InvalidAmount(_) => "invalid_amount",
            Error::EmptyDescription => "empty_description",
            Error::InsufficientFunds { .. } => "insufficient_funds",
            Error::InvalidRange(_) => "invalid_range",
            Error::ProtectedEntity => "protected_entity",
            Error::DuplicateCashAccount => "duplicate_cash_account",
            Error::DatabaseLock | Error::Sql(_) => "storage_failure",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidAmount(_) | Error::EmptyDescription | Error::InvalidRange(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::InsufficientFunds { .. }
            | Error::ProtectedEntity
            | Error::DuplicateCashAccount => StatusCode::CONFLICT,
            Error::DatabaseLock | Error::Sql(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // SQL error details are for the server logs, not the client.
        let message = match &self {
            Error::Sql(error) => {
                tracing::error!("an unexpected SQL error occurred: {error}");
                "an internal storage error occurred, try again later".to_owned()
            }
            error => error.to_string(),
        };

        (
            self.status_code(),
            Json(json!({ "error": self.code(), "message": message })),
        )
            .into_response()
    }
}
