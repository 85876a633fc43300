//! The incremental transaction synchronization engine.
//!
//! A sync pass iterates over every linked item: the pagination driver in
//! [pagination] drives Plaid's `/transactions/sync` to exhaustion for the
//! item, then the accumulated deltas and the final cursor are committed
//! atomically through [crate::stores::SyncStore::apply_sync_batch]. The
//! orchestrator in [orchestrator] aggregates the counts and stops on the
//! first unrecoverable error.

mod endpoint;
mod orchestrator;
mod pagination;

pub use endpoint::sync_transactions_endpoint;
pub use orchestrator::{SyncSummary, run_sync_pass};
pub use pagination::{TransactionDeltas, fetch_transaction_deltas};
