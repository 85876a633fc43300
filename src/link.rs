//! The account-linking flow: issuing link tokens and exchanging a completed
//! link's public token for a stored item.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    item::Item,
    plaid::PlaidApi,
    state::AppState,
    stores::{ItemStore, SQLiteItemStore},
};

#[derive(Debug, Serialize)]
struct LinkTokenResponse {
    #[serde(rename = "LinkToken")]
    link_token: String,
}

/// A route handler that creates a token for the client-side link flow.
pub async fn create_link_token_endpoint<C>(State(state): State<AppState<C>>) -> Response
where
    C: PlaidApi + 'static,
{
    match state.plaid_client.create_link_token().await {
        Ok(link_token) => (
            StatusCode::CREATED,
            Json(LinkTokenResponse { link_token }),
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

/// The payload the link client sends after the user completes the link flow.
#[derive(Debug, Deserialize)]
pub struct LinkSuccessPayload {
    /// The short-lived public token to exchange for an access token.
    pub public_token: String,
    /// The institution the user linked.
    pub institution: LinkInstitution,
}

/// The institution block of [LinkSuccessPayload].
#[derive(Debug, Deserialize)]
pub struct LinkInstitution {
    /// Plaid's identifier for the institution.
    #[serde(rename = "institution_id")]
    pub id: String,
}

/// A route handler that exchanges a public token for an access token and
/// stores the newly linked item.
///
/// Each institution may be linked at most once per deployment.
pub async fn get_access_token_endpoint<C>(
    State(state): State<AppState<C>>,
    Json(payload): Json<LinkSuccessPayload>,
) -> Response
where
    C: PlaidApi + 'static,
{
    let mut items = SQLiteItemStore::new(state.db_connection.clone());

    match link_item(state.plaid_client.as_ref(), &mut items, &payload).await {
        Ok(item) => {
            tracing::info!(item = %item.plaid_item_id, institution = %item.plaid_institution_id, "linked new item");
            Json(serde_json::json!({})).into_response()
        }
        Err(error) => error.into_response(),
    }
}

async fn link_item<C, I>(
    client: &C,
    items: &mut I,
    payload: &LinkSuccessPayload,
) -> Result<Item, Error>
where
    C: PlaidApi,
    I: ItemStore,
{
    if !items.for_institution(&payload.institution.id)?.is_empty() {
        return Err(Error::InstitutionAlreadyLinked(
            payload.institution.id.clone(),
        ));
    }

    let exchange = client.exchange_public_token(&payload.public_token).await?;

    items.create(
        &exchange.item_id,
        &exchange.access_token,
        &payload.institution.id,
    )
}
