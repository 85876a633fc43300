//! The linked bank account, called an "item" in Plaid's terms, and the
//! endpoint for listing them.

use axum::{Json, extract::State, response::{IntoResponse, Response}};
use serde::Serialize;

use crate::{
    db::DatabaseID,
    plaid::PlaidApi,
    state::AppState,
    stores::{ItemStore, SQLiteItemStore},
};

/// One linked bank connection.
///
/// Created once when a user completes the link flow and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    /// The item's row ID.
    pub id: DatabaseID,

    /// Plaid's opaque identifier for the item.
    pub plaid_item_id: String,

    /// The access credential for the item.
    ///
    /// Never serialized into API responses.
    #[serde(skip_serializing)]
    pub plaid_access_token: String,

    /// Plaid's identifier for the institution the item belongs to.
    pub plaid_institution_id: String,
}

/// A route handler for listing the linked items.
pub async fn get_items_endpoint<C>(State(state): State<AppState<C>>) -> Response
where
    C: PlaidApi + 'static,
{
    let store = SQLiteItemStore::new(state.db_connection.clone());

    match store.list() {
        Ok(items) => Json(items).into_response(),
        Err(error) => error.into_response(),
    }
}
