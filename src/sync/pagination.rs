//! The pagination driver for Plaid's transaction delta API.

use crate::{
    Error,
    plaid::{AddedTransaction, PlaidApi, RemovedTransaction},
};

/// The complete set of deltas available upstream for one item "right now",
/// produced by driving the upstream pagination to exhaustion.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDeltas {
    /// Added transactions, in the order upstream reported them.
    pub added: Vec<AddedTransaction>,
    /// Removed transactions, in the order upstream reported them.
    pub removed: Vec<RemovedTransaction>,
    /// The cursor marking the end of this delta window.
    pub next_cursor: String,
}

/// Repeatedly request delta pages for one item until upstream reports no
/// further pages, accumulating added and removed records across pages.
///
/// `starting_cursor` is `None` for an item that has never synced; the cursor
/// field is then omitted from the first request because upstream rejects an
/// empty-string cursor as malformed.
///
/// The loop terminates only when upstream reports `has_more == false`, so an
/// upstream that never does causes an indefinite loop. No page ceiling is
/// enforced here; the page count is traced for operators instead.
///
/// # Errors
/// Returns the first page-fetch error as-is, discarding any pages already
/// accumulated. No retry is attempted at this layer.
pub async fn fetch_transaction_deltas<C>(
    client: &C,
    access_token: &str,
    starting_cursor: Option<String>,
) -> Result<TransactionDeltas, Error>
where
    C: PlaidApi,
{
    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut cursor = starting_cursor;
    let mut page_count = 0u64;

    loop {
        let page = client
            .transactions_sync(access_token, cursor.as_deref())
            .await?;
        page_count += 1;

        added.extend(page.added);
        removed.extend(page.removed);
        cursor = Some(page.next_cursor);

        if !page.has_more {
            break;
        }
    }

    tracing::debug!(pages = page_count, "drove upstream pagination to exhaustion");

    Ok(TransactionDeltas {
        added,
        removed,
        // The loop body always runs at least once, so the cursor is set.
        next_cursor: cursor.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        plaid::testing::{FakePlaid, added, page, removed},
    };

    use super::fetch_transaction_deltas;

    #[tokio::test]
    async fn single_page_returns_its_records_and_cursor() {
        let plaid = FakePlaid::default();
        plaid.queue_page(
            "access-1",
            Ok(page(
                vec![added("tx-1"), added("tx-2"), added("tx-3")],
                vec![],
                "c1",
                false,
            )),
        );

        let deltas = fetch_transaction_deltas(&plaid, "access-1", None)
            .await
            .unwrap();

        assert_eq!(deltas.added.len(), 3);
        assert_eq!(deltas.removed.len(), 0);
        assert_eq!(deltas.next_cursor, "c1");
    }

    #[tokio::test]
    async fn accumulates_pages_in_order_with_final_cursor() {
        let plaid = FakePlaid::default();
        plaid.queue_page(
            "access-1",
            Ok(page(
                vec![added("tx-1"), added("tx-2")],
                vec![removed("tx-old")],
                "c1",
                true,
            )),
        );
        plaid.queue_page(
            "access-1",
            Ok(page(
                vec![added("tx-3"), added("tx-4"), added("tx-5")],
                vec![],
                "c2",
                false,
            )),
        );

        let deltas = fetch_transaction_deltas(&plaid, "access-1", None)
            .await
            .unwrap();

        let added_ids: Vec<_> = deltas
            .added
            .iter()
            .map(|record| record.transaction_id.as_str())
            .collect();
        assert_eq!(added_ids, ["tx-1", "tx-2", "tx-3", "tx-4", "tx-5"]);
        assert_eq!(deltas.removed, vec![removed("tx-old")]);
        assert_eq!(deltas.next_cursor, "c2");
    }

    #[tokio::test]
    async fn omits_cursor_on_first_sync_then_continues_from_page_cursors() {
        let plaid = FakePlaid::default();
        plaid.queue_page("access-1", Ok(page(vec![], vec![], "c1", true)));
        plaid.queue_page("access-1", Ok(page(vec![], vec![], "c2", false)));

        fetch_transaction_deltas(&plaid, "access-1", None)
            .await
            .unwrap();

        let requests = plaid.sync_requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                ("access-1".to_owned(), None),
                ("access-1".to_owned(), Some("c1".to_owned())),
            ]
        );
    }

    #[tokio::test]
    async fn starts_from_the_stored_cursor_when_present() {
        let plaid = FakePlaid::default();
        plaid.queue_page("access-1", Ok(page(vec![], vec![], "c2", false)));

        fetch_transaction_deltas(&plaid, "access-1", Some("c1".to_owned()))
            .await
            .unwrap();

        let requests = plaid.sync_requests.lock().unwrap().clone();
        assert_eq!(requests, vec![("access-1".to_owned(), Some("c1".to_owned()))]);
    }

    #[tokio::test]
    async fn page_fetch_error_aborts_with_no_partial_results() {
        let plaid = FakePlaid::default();
        plaid.queue_page(
            "access-1",
            Ok(page(vec![added("tx-1")], vec![], "c1", true)),
        );
        plaid.queue_page(
            "access-1",
            Err(Error::Upstream("RATE_LIMIT_EXCEEDED".to_owned())),
        );

        let result = fetch_transaction_deltas(&plaid, "access-1", None).await;

        assert_eq!(
            result,
            Err(Error::Upstream("RATE_LIMIT_EXCEEDED".to_owned()))
        );
    }
}
