//! Defines the store traits for linked items, sync state and institutions,
//! and their SQLite implementations.
//!
//! All mutation of sync state goes through [SyncStore::apply_sync_batch],
//! which applies one account's deltas and cursor as a single database
//! transaction.

pub mod sqlite;

pub use sqlite::{SQLiteInstitutionStore, SQLiteItemStore, SQLiteSyncStore};

use crate::{
    Error,
    institution::Institution,
    item::Item,
    plaid::{AddedTransaction, RemovedTransaction},
};

/// Handles the creation and retrieval of linked items.
///
/// Items are immutable once created; there is no update or delete path.
pub trait ItemStore {
    /// Store a newly linked item.
    fn create(
        &mut self,
        plaid_item_id: &str,
        plaid_access_token: &str,
        plaid_institution_id: &str,
    ) -> Result<Item, Error>;

    /// Retrieve every linked item, in storage order.
    fn list(&self) -> Result<Vec<Item>, Error>;

    /// Retrieve the items linked for an institution.
    fn for_institution(&self, plaid_institution_id: &str) -> Result<Vec<Item>, Error>;

    /// Retrieve the distinct institution IDs across all items.
    fn institution_ids(&self) -> Result<Vec<String>, Error>;
}

/// Handles per-item sync cursors and the atomic application of sync results.
pub trait SyncStore {
    /// Retrieve the last committed cursor for an item.
    ///
    /// `None` means the item has never completed a sync pass and the next
    /// pass must start from the beginning of the upstream change stream.
    fn cursor(&self, plaid_item_id: &str) -> Result<Option<String>, Error>;

    /// Apply one full pagination run for an item as a single atomic unit:
    /// insert `added`, flag `removed` as deleted, and store `next_cursor`.
    ///
    /// Either all three steps become visible or none do. Returns the number
    /// of rows inserted; removed records that match no stored transaction are
    /// silently skipped, so callers must treat the removed count they pass in
    /// as a request count rather than a confirmed mutation count.
    ///
    /// # Errors
    /// Returns [Error::DuplicateTransaction] if any added record's
    /// transaction ID is already stored. This is the guard against applying
    /// the same delta page twice.
    fn apply_sync_batch(
        &mut self,
        plaid_item_id: &str,
        added: &[AddedTransaction],
        removed: &[RemovedTransaction],
        next_cursor: &str,
    ) -> Result<usize, Error>;
}

/// Handles cached institution display metadata.
pub trait InstitutionStore {
    /// Retrieve an institution by its Plaid institution ID.
    fn get(&self, plaid_institution_id: &str) -> Result<Option<Institution>, Error>;

    /// Insert the institution, or update it if it was loaded from the store.
    fn upsert(&mut self, institution: &Institution) -> Result<(), Error>;
}
