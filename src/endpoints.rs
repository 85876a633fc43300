//! The API endpoint URIs.

/// The route for creating a token for the client-side link flow.
pub const CREATE_LINK_TOKEN: &str = "/create_link_token";
/// The route for exchanging a public token and storing the linked item.
pub const GET_ACCESS_TOKEN: &str = "/get_access_token";
/// The route for listing the linked items.
pub const ITEMS: &str = "/api/items";
/// The route that runs one transaction sync pass over all linked items.
pub const SYNC_TRANSACTIONS: &str = "/admin/transactions/sync";
/// The route that refreshes cached institution metadata.
pub const REFRESH_INSTITUTIONS: &str = "/admin/institutions/refresh";
