//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    endpoints,
    institution::refresh_institutions_endpoint,
    item::get_items_endpoint,
    link::{create_link_token_endpoint, get_access_token_endpoint},
    plaid::PlaidApi,
    state::AppState,
    sync::sync_transactions_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router<C>(state: AppState<C>) -> Router
where
    C: PlaidApi + 'static,
{
    Router::new()
        .route(
            endpoints::CREATE_LINK_TOKEN,
            post(create_link_token_endpoint::<C>),
        )
        .route(
            endpoints::GET_ACCESS_TOKEN,
            post(get_access_token_endpoint::<C>),
        )
        .route(endpoints::ITEMS, get(get_items_endpoint::<C>))
        .route(
            endpoints::SYNC_TRANSACTIONS,
            post(sync_transactions_endpoint::<C>),
        )
        .route(
            endpoints::REFRESH_INSTITUTIONS,
            post(refresh_institutions_endpoint::<C>),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{plaid::testing::FakePlaid, state::AppState};

    use super::build_router;

    #[tokio::test]
    async fn unknown_routes_return_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        let state = AppState::new(conn, FakePlaid::default()).unwrap();
        let server = TestServer::new(build_router(state));

        let response = server.get("/no/such/route").await;

        response.assert_status_not_found();
    }
}
