//! Database schema initialization.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    stores::{SQLiteInstitutionStore, SQLiteItemStore, SQLiteSyncStore},
};

/// Alias for the integer type used for database row IDs.
pub type DatabaseID = i64;

/// Create the application's tables if they do not exist yet.
///
/// The tables are created inside one exclusive transaction so a crash during
/// startup cannot leave a half-initialized schema.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    SQLiteItemStore::create_table(&transaction)?;
    SQLiteInstitutionStore::create_table(&transaction)?;
    SQLiteSyncStore::create_tables(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                ('items', 'institutions', 'cursors', 'plaid_transactions')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
    }
}
