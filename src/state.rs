//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex, atomic::AtomicBool};

use rusqlite::Connection;

use crate::{Error, db::initialize, plaid::PlaidApi};

/// The state of the REST server.
///
/// The database connection is the only shared mutable resource; the mutex
/// around it serializes writers.
#[derive(Debug)]
pub struct AppState<C>
where
    C: PlaidApi,
{
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The client for the Plaid API.
    pub plaid_client: Arc<C>,

    /// Raised during shutdown so in-flight sync and refresh passes stop at
    /// the next between-accounts checkpoint.
    pub cancel_flag: Arc<AtomicBool>,
}

impl<C> AppState<C>
where
    C: PlaidApi,
{
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the application's
    /// tables.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, plaid_client: C) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            plaid_client: Arc::new(plaid_client),
            cancel_flag: Arc::new(AtomicBool::new(false)),
        })
    }
}

// Implemented by hand so `C` itself does not need to be `Clone`.
impl<C> Clone for AppState<C>
where
    C: PlaidApi,
{
    fn clone(&self) -> Self {
        Self {
            db_connection: self.db_connection.clone(),
            plaid_client: self.plaid_client.clone(),
            cancel_flag: self.cancel_flag.clone(),
        }
    }
}
