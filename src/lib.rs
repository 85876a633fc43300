//! Expense tracker is a small web service that links bank accounts through
//! the Plaid aggregation API and keeps a local, reviewable copy of their
//! transactions.
//!
//! The heart of the library is the incremental sync engine in `sync`: a
//! cursor-based pagination driver over Plaid's `/transactions/sync` endpoint
//! and an atomic reconciliation writer that applies each account's
//! added/removed deltas and new cursor to SQLite as a single transaction.

#![warn(missing_docs)]

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod db;
mod endpoints;
mod institution;
mod item;
mod link;
mod plaid;
mod routing;
mod state;
mod stores;
mod sync;

pub use db::initialize as initialize_db;
pub use plaid::{
    AddedTransaction, DeltaPage, Environment, InstitutionMetadata, PlaidApi, PlaidClient,
    RemovedTransaction, TokenExchange,
};
pub use routing::build_router;
pub use state::AppState;

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`. `cancel_flag` is the flag the
/// sync orchestrator checks between accounts; raising it lets an in-flight
/// sync pass stop cleanly after the current account commits.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>, cancel_flag: Arc<AtomicBool>) {
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
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
        },
    }

    cancel_flag.store(true, Ordering::Relaxed);
    handle.graceful_shutdown(Some(Duration::from_secs(1)));
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A request to the Plaid API failed.
    ///
    /// This covers network failures, auth and rate-limit rejections, and
    /// responses that could not be parsed. The sync engine never retries
    /// these; the caller should issue a fresh sync pass later.
    #[error("upstream API error: {0}")]
    Upstream(String),

    /// A transaction with the same Plaid transaction ID already exists in the
    /// database.
    ///
    /// Inserts during reconciliation intentionally fail on duplicates. This
    /// guards against applying the same delta page twice, which would
    /// otherwise double-count transactions.
    #[error("the transaction ID already exists in the database")]
    DuplicateTransaction,

    /// The institution from the link flow already has a linked item.
    #[error("institution {0} is already linked")]
    InstitutionAlreadyLinked(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// A transaction payload could not be serialized as JSON for storage.
    #[error("could not serialize transaction as JSON: {0}")]
    JsonSerialization(String),

    /// A sync or refresh pass was cancelled before visiting every account.
    ///
    /// Accounts committed before the cancellation stay committed; the next
    /// pass resumes the rest from their stored cursors.
    #[error("pass cancelled before completion")]
    Cancelled,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067
                    && desc.contains("plaid_transactions.plaid_transaction_id") =>
            {
                Error::DuplicateTransaction
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON error body returned to API clients.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    #[serde(rename = "ErrorMsg")]
    error_msg: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = match self {
            Error::Upstream(_) | Error::InstitutionAlreadyLinked(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::DuplicateTransaction
            | Error::SqlError(_)
            | Error::JsonSerialization(_)
            | Error::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (
            status_code,
            Json(ErrorResponse {
                error_msg: self.to_string(),
            }),
        )
            .into_response()
    }
}
