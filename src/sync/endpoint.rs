//! The route handler that triggers a sync pass.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{
    plaid::PlaidApi,
    state::AppState,
    stores::{SQLiteItemStore, SQLiteSyncStore},
    sync::orchestrator::run_sync_pass,
};

/// A route handler that runs one sync pass over all linked items and responds
/// with the aggregate counts, or with the first error encountered.
///
/// Items committed before a failure stay committed; they are not reported
/// separately in the error response.
pub async fn sync_transactions_endpoint<C>(State(state): State<AppState<C>>) -> Response
where
    C: PlaidApi + 'static,
{
    let items = SQLiteItemStore::new(state.db_connection.clone());
    let mut sync_store = SQLiteSyncStore::new(state.db_connection.clone());

    match run_sync_pass(
        state.plaid_client.as_ref(),
        &items,
        &mut sync_store,
        &state.cancel_flag,
    )
    .await
    {
        Ok(summary) => Json(summary).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        Error, build_router, endpoints,
        plaid::testing::{FakePlaid, added, page},
        state::AppState,
        stores::{ItemStore, SQLiteItemStore},
    };

    fn test_server(plaid: FakePlaid) -> (TestServer, AppState<FakePlaid>) {
        let conn = Connection::open_in_memory().unwrap();
        let state = AppState::new(conn, plaid).unwrap();
        let server = TestServer::new(build_router(state.clone()));

        (server, state)
    }

    #[tokio::test]
    async fn sync_reports_aggregate_counts() {
        let plaid = FakePlaid::default();
        plaid.queue_page(
            "access-1",
            Ok(page(vec![added("tx-1"), added("tx-2")], vec![], "c1", false)),
        );
        let (server, state) = test_server(plaid);
        let mut items = SQLiteItemStore::new(state.db_connection.clone());
        items.create("item-1", "access-1", "ins_1").unwrap();

        let response = server.post(endpoints::SYNC_TRANSACTIONS).await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["transactions_added"], 2);
        assert_eq!(body["transactions_removed"], 0);
    }

    #[tokio::test]
    async fn sync_reports_the_first_upstream_error() {
        let plaid = FakePlaid::default();
        plaid.queue_page(
            "access-1",
            Err(Error::Upstream("ITEM_LOGIN_REQUIRED".to_owned())),
        );
        let (server, state) = test_server(plaid);
        let mut items = SQLiteItemStore::new(state.db_connection.clone());
        items.create("item-1", "access-1", "ins_1").unwrap();

        let response = server.post(endpoints::SYNC_TRANSACTIONS).await;

        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(
            body["ErrorMsg"],
            "upstream API error: ITEM_LOGIN_REQUIRED"
        );
    }
}
