//! Implements a SQLite backed institution metadata store.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};

use crate::{Error, institution::Institution, stores::InstitutionStore};

/// Stores cached institution display metadata in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteInstitutionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteInstitutionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Create the institutions table.
    pub(crate) fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS institutions (
                id INTEGER PRIMARY KEY,
                plaid_institution_id TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                logo TEXT NOT NULL DEFAULT ''
                )",
            (),
        )?;

        Ok(())
    }

    fn map_row(row: &Row) -> Result<Institution, rusqlite::Error> {
        Ok(Institution {
            id: Some(row.get(0)?),
            plaid_institution_id: row.get(1)?,
            name: row.get(2)?,
            logo: row.get(3)?,
        })
    }
}

impl InstitutionStore for SQLiteInstitutionStore {
    fn get(&self, plaid_institution_id: &str) -> Result<Option<Institution>, Error> {
        let result = self.connection.lock().unwrap().query_row(
            "SELECT id, plaid_institution_id, name, logo FROM institutions
             WHERE plaid_institution_id = :institution_id",
            &[(":institution_id", plaid_institution_id)],
            Self::map_row,
        );

        match result {
            Ok(institution) => Ok(Some(institution)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn upsert(&mut self, institution: &Institution) -> Result<(), Error> {
        let connection = self.connection.lock().unwrap();

        match institution.id {
            Some(id) => {
                connection.execute(
                    "UPDATE institutions SET plaid_institution_id = ?1, name = ?2, logo = ?3
                     WHERE id = ?4",
                    (
                        &institution.plaid_institution_id,
                        &institution.name,
                        &institution.logo,
                        id,
                    ),
                )?;
            }
            None => {
                connection.execute(
                    "INSERT INTO institutions (plaid_institution_id, name, logo)
                     VALUES (?1, ?2, ?3)",
                    (
                        &institution.plaid_institution_id,
                        &institution.name,
                        &institution.logo,
                    ),
                )?;
            }
        }

        Ok(())
    }
}
