//! SQLite backed implementations of the store traits.
//!
//! Each store holds a clone of the application's single shared connection;
//! SQLite serializes writers through the mutex around it.

mod institution;
mod item;
mod sync;

pub use institution::SQLiteInstitutionStore;
pub use item::SQLiteItemStore;
pub use sync::SQLiteSyncStore;
