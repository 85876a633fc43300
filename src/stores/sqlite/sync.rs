//! Implements the SQLite backed sync store: the per-item cursor tracker and
//! the reconciliation writer.
//!
//! [SQLiteSyncStore::apply_sync_batch] is the only place sync state is
//! mutated. It runs one database transaction per item per pass, so the cursor
//! stored for an item always reflects a page boundary whose preceding
//! added/removed records were durably committed.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, params_from_iter, types::Value};

use crate::{
    Error,
    plaid::{AddedTransaction, RemovedTransaction},
    stores::SyncStore,
};

/// Added records are inserted in multi-row statements of at most this many
/// rows to bound statement size.
const INSERT_BATCH_SIZE: usize = 5;

/// Stores sync cursors and transaction records in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteSyncStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteSyncStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Create the cursors and transactions tables.
    pub(crate) fn create_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS cursors (
                plaid_item_id TEXT PRIMARY KEY,
                cursor TEXT NOT NULL
                )",
            (),
        )?;

        connection.execute(
            "CREATE TABLE IF NOT EXISTS plaid_transactions (
                id INTEGER PRIMARY KEY,
                plaid_transaction TEXT NOT NULL,
                plaid_transaction_id TEXT UNIQUE NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0
                )",
            (),
        )?;

        Ok(())
    }
}

impl SyncStore for SQLiteSyncStore {
    fn cursor(&self, plaid_item_id: &str) -> Result<Option<String>, Error> {
        let result = self.connection.lock().unwrap().query_row(
            "SELECT cursor FROM cursors WHERE plaid_item_id = :item_id",
            &[(":item_id", plaid_item_id)],
            |row| row.get(0),
        );

        match result {
            Ok(cursor) => Ok(Some(cursor)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Apply one full pagination run for an item as a single atomic unit.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DuplicateTransaction] if any added record's transaction ID
    ///   is already stored (the whole batch is rolled back),
    /// - [Error::JsonSerialization] if a payload cannot be serialized,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn apply_sync_batch(
        &mut self,
        plaid_item_id: &str,
        added: &[AddedTransaction],
        removed: &[RemovedTransaction],
        next_cursor: &str,
    ) -> Result<usize, Error> {
        let connection = self.connection.lock().unwrap();
        // Rolls back on drop unless committed below.
        let tx = connection.unchecked_transaction()?;

        let mut rows_added = 0;
        for chunk in added.chunks(INSERT_BATCH_SIZE) {
            let values_clause = (0..chunk.len())
                .map(|index| format!("(?{}, ?{}, 0)", index * 2 + 1, index * 2 + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let statement = format!(
                "INSERT INTO plaid_transactions (plaid_transaction, plaid_transaction_id, deleted)
                 VALUES {values_clause}"
            );

            let mut parameters = Vec::with_capacity(chunk.len() * 2);
            for record in chunk {
                let payload = serde_json::to_string(record)
                    .map_err(|error| Error::JsonSerialization(error.to_string()))?;
                parameters.push(Value::Text(payload));
                parameters.push(Value::Text(record.transaction_id.clone()));
            }

            rows_added += tx.execute(&statement, params_from_iter(parameters))?;
        }

        // A removal that matches no stored row is treated as already absent.
        for removal in removed {
            tx.execute(
                "UPDATE plaid_transactions SET deleted = 1 WHERE plaid_transaction_id = ?1",
                [removal.transaction_id.as_str()],
            )?;
        }

        tx.execute(
            "REPLACE INTO cursors (plaid_item_id, cursor) VALUES (?1, ?2)",
            (plaid_item_id, next_cursor),
        )?;

        tx.commit()?;

        Ok(rows_added)
    }
}
