//! The sync orchestrator: one synchronization pass across every linked item.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::{
    Error,
    plaid::PlaidApi,
    stores::{ItemStore, SyncStore},
    sync::pagination::fetch_transaction_deltas,
};

/// The aggregate result of one sync pass.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    /// Rows inserted across all synced items.
    pub transactions_added: usize,
    /// Removed records REQUESTED across all synced items.
    ///
    /// Removals that matched no stored transaction are still counted here, so
    /// this is not a confirmed mutation count. Callers depend on this
    /// request-count semantic, so it is kept even though it is asymmetric
    /// with `transactions_added`.
    pub transactions_removed: usize,
}

/// Run one synchronization pass across every linked item, in store order.
///
/// Per item: read the stored cursor, drive upstream pagination to exhaustion,
/// and commit the results atomically. The first failure aborts the pass;
/// items committed earlier in the same pass stay committed, and the next pass
/// resumes every unsynced item from its last stored cursor.
///
/// `cancel` is checked between items only. A pass cancelled part way returns
/// [Error::Cancelled] and leaves already-committed items intact; cancellation
/// never interrupts an item's pagination or reconciliation mid-flight.
///
/// There is no guard against overlapping passes; callers must not run two
/// passes over the same store concurrently.
pub async fn run_sync_pass<C, I, S>(
    client: &C,
    items: &I,
    sync_store: &mut S,
    cancel: &AtomicBool,
) -> Result<SyncSummary, Error>
where
    C: PlaidApi,
    I: ItemStore,
    S: SyncStore,
{
    let mut summary = SyncSummary::default();

    for item in items.list()? {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let cursor = sync_store.cursor(&item.plaid_item_id)?;
        let deltas =
            fetch_transaction_deltas(client, &item.plaid_access_token, cursor).await?;

        let removed_requested = deltas.removed.len();
        let rows_added = sync_store.apply_sync_batch(
            &item.plaid_item_id,
            &deltas.added,
            &deltas.removed,
            &deltas.next_cursor,
        )?;

        tracing::info!(
            item = %item.plaid_item_id,
            added = rows_added,
            removed = removed_requested,
            "synced item"
        );

        summary.transactions_added += rows_added;
        summary.transactions_removed += removed_requested;
    }

    Ok(summary)
}
