//! Implements a SQLite backed item store.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};

use crate::{Error, item::Item, stores::ItemStore};

/// Stores linked items in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteItemStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteItemStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Create the items table.
    pub(crate) fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY,
                plaid_item_id TEXT UNIQUE NOT NULL,
                plaid_access_token TEXT NOT NULL,
                plaid_institution_id TEXT NOT NULL
                )",
            (),
        )?;

        Ok(())
    }

    fn map_row(row: &Row) -> Result<Item, rusqlite::Error> {
        Ok(Item {
            id: row.get(0)?,
            plaid_item_id: row.get(1)?,
            plaid_access_token: row.get(2)?,
            plaid_institution_id: row.get(3)?,
        })
    }
}

impl ItemStore for SQLiteItemStore {
    /// Store a newly linked item.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the item ID is already stored or there
    /// is some other SQL error.
    fn create(
        &mut self,
        plaid_item_id: &str,
        plaid_access_token: &str,
        plaid_institution_id: &str,
    ) -> Result<Item, Error> {
        let connection = self.connection.lock().unwrap();

        connection.execute(
            "INSERT INTO items (plaid_item_id, plaid_access_token, plaid_institution_id)
             VALUES (?1, ?2, ?3)",
            (plaid_item_id, plaid_access_token, plaid_institution_id),
        )?;

        Ok(Item {
            id: connection.last_insert_rowid(),
            plaid_item_id: plaid_item_id.to_owned(),
            plaid_access_token: plaid_access_token.to_owned(),
            plaid_institution_id: plaid_institution_id.to_owned(),
        })
    }

    fn list(&self) -> Result<Vec<Item>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(
                "SELECT id, plaid_item_id, plaid_access_token, plaid_institution_id FROM items",
            )?
            .query_map([], Self::map_row)?
            .map(|maybe_item| maybe_item.map_err(Error::from))
            .collect()
    }

    fn for_institution(&self, plaid_institution_id: &str) -> Result<Vec<Item>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(
                "SELECT id, plaid_item_id, plaid_access_token, plaid_institution_id FROM items
                 WHERE plaid_institution_id = :institution_id",
            )?
            .query_map(&[(":institution_id", plaid_institution_id)], Self::map_row)?
            .map(|maybe_item| maybe_item.map_err(Error::from))
            .collect()
    }

    fn institution_ids(&self) -> Result<Vec<String>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare("SELECT DISTINCT plaid_institution_id FROM items")?
            .query_map([], |row| row.get(0))?
            .map(|maybe_id| maybe_id.map_err(Error::from))
            .collect()
    }
}
