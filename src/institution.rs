//! Cached institution display metadata and the refresh sweep that fills it
//! from Plaid.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    db::DatabaseID,
    plaid::PlaidApi,
    state::AppState,
    stores::{InstitutionStore, ItemStore, SQLiteInstitutionStore, SQLiteItemStore},
};

/// Cached display metadata for one institution.
#[derive(Debug, Clone, PartialEq)]
pub struct Institution {
    /// The institution's row ID; `None` until it has been stored.
    pub id: Option<DatabaseID>,
    /// Plaid's identifier for the institution.
    pub plaid_institution_id: String,
    /// The institution's display name.
    pub name: String,
    /// A base64 encoded PNG logo, or empty when Plaid has none.
    pub logo: String,
}

/// A route handler that refreshes cached metadata for every institution with
/// a linked item.
pub async fn refresh_institutions_endpoint<C>(State(state): State<AppState<C>>) -> Response
where
    C: PlaidApi + 'static,
{
    let items = SQLiteItemStore::new(state.db_connection.clone());
    let mut institutions = SQLiteInstitutionStore::new(state.db_connection.clone());

    match refresh_institutions(
        state.plaid_client.as_ref(),
        &items,
        &mut institutions,
        &state.cancel_flag,
    )
    .await
    {
        Ok(refreshed) => {
            tracing::info!(refreshed, "refreshed institution metadata");
            Json(serde_json::json!({})).into_response()
        }
        Err(error) => error.into_response(),
    }
}

/// Sweep the distinct institution IDs over all items and fetch metadata for
/// the institutions that are missing a name or logo.
///
/// Institutions that already have both are skipped. The first error stops the
/// sweep; institutions refreshed before it stay stored. Returns the number of
/// institutions refreshed.
async fn refresh_institutions<C, I, N>(
    client: &C,
    items: &I,
    institutions: &mut N,
    cancel: &AtomicBool,
) -> Result<usize, Error>
where
    C: PlaidApi,
    I: ItemStore,
    N: InstitutionStore,
{
    let mut refreshed = 0;

    for institution_id in items.institution_ids()? {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let existing = institutions.get(&institution_id)?;
        if let Some(institution) = &existing
            && !institution.name.is_empty()
            && !institution.logo.is_empty()
        {
            continue;
        }

        let metadata = client.institution_by_id(&institution_id).await?;

        let mut institution = existing.unwrap_or(Institution {
            id: None,
            plaid_institution_id: institution_id.clone(),
            name: String::new(),
            logo: String::new(),
        });
        institution.name = metadata.name;
        // Keep a previously cached logo when Plaid stops returning one.
        if let Some(logo) = metadata.logo
            && !logo.is_empty()
        {
            institution.logo = logo;
        }

        institutions.upsert(&institution)?;
        refreshed += 1;
    }

    Ok(refreshed)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        plaid::{InstitutionMetadata, testing::FakePlaid},
        stores::{InstitutionStore, ItemStore, SQLiteInstitutionStore, SQLiteItemStore},
    };

    use super::{Institution, refresh_institutions};

    fn init_stores() -> (SQLiteItemStore, SQLiteInstitutionStore) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        (
            SQLiteItemStore::new(conn.clone()),
            SQLiteInstitutionStore::new(conn),
        )
    }

    fn metadata(id: &str, name: &str, logo: Option<&str>) -> InstitutionMetadata {
        InstitutionMetadata {
            institution_id: id.to_owned(),
            name: name.to_owned(),
            logo: logo.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn refresh_fetches_and_stores_missing_metadata() {
        let (mut items, mut institutions) = init_stores();
        items.create("item-1", "access-1", "ins_1").unwrap();
        let plaid = FakePlaid::default();
        plaid.add_institution(metadata("ins_1", "First Bank", Some("bG9nbw==")));
        let cancel = AtomicBool::new(false);

        let refreshed = refresh_institutions(&plaid, &items, &mut institutions, &cancel)
            .await
            .unwrap();

        assert_eq!(refreshed, 1);
        let stored = institutions.get("ins_1").unwrap().unwrap();
        assert_eq!(stored.name, "First Bank");
        assert_eq!(stored.logo, "bG9nbw==");
    }

    #[tokio::test]
    async fn refresh_skips_institutions_with_complete_metadata() {
        let (mut items, mut institutions) = init_stores();
        items.create("item-1", "access-1", "ins_1").unwrap();
        institutions
            .upsert(&Institution {
                id: None,
                plaid_institution_id: "ins_1".to_owned(),
                name: "First Bank".to_owned(),
                logo: "bG9nbw==".to_owned(),
            })
            .unwrap();
        // No scripted metadata: a fetch for ins_1 would fail the sweep.
        let plaid = FakePlaid::default();
        let cancel = AtomicBool::new(false);

        let refreshed = refresh_institutions(&plaid, &items, &mut institutions, &cancel)
            .await
            .unwrap();

        assert_eq!(refreshed, 0);
    }

    #[tokio::test]
    async fn refresh_keeps_cached_logo_when_upstream_has_none() {
        let (mut items, mut institutions) = init_stores();
        items.create("item-1", "access-1", "ins_1").unwrap();
        institutions
            .upsert(&Institution {
                id: None,
                plaid_institution_id: "ins_1".to_owned(),
                name: String::new(),
                logo: "bG9nbw==".to_owned(),
            })
            .unwrap();
        let plaid = FakePlaid::default();
        plaid.add_institution(metadata("ins_1", "First Bank", None));
        let cancel = AtomicBool::new(false);

        refresh_institutions(&plaid, &items, &mut institutions, &cancel)
            .await
            .unwrap();

        let stored = institutions.get("ins_1").unwrap().unwrap();
        assert_eq!(stored.name, "First Bank");
        assert_eq!(stored.logo, "bG9nbw==");
    }

    #[tokio::test]
    async fn refresh_stops_on_first_error() {
        let (mut items, mut institutions) = init_stores();
        items.create("item-1", "access-1", "ins_1").unwrap();
        items.create("item-2", "access-2", "ins_2").unwrap();
        let plaid = FakePlaid::default();
        // Only ins_1 is scripted; the ins_2 fetch fails the sweep.
        plaid.add_institution(metadata("ins_1", "First Bank", None));
        let cancel = AtomicBool::new(false);

        let result = refresh_institutions(&plaid, &items, &mut institutions, &cancel).await;

        assert!(matches!(result, Err(Error::Upstream(_))));
        // The institution refreshed before the failure stays stored.
        assert!(institutions.get("ins_1").unwrap().is_some());
        assert_eq!(institutions.get("ins_2").unwrap(), None);
    }

    #[tokio::test]
    async fn refresh_honors_cancellation_between_institutions() {
        let (mut items, mut institutions) = init_stores();
        items.create("item-1", "access-1", "ins_1").unwrap();
        let plaid = FakePlaid::default();
        plaid.add_institution(metadata("ins_1", "First Bank", None));
        let cancel = AtomicBool::new(false);
        cancel.store(true, Ordering::Relaxed);

        let result = refresh_institutions(&plaid, &items, &mut institutions, &cancel).await;

        assert_eq!(result, Err(Error::Cancelled));
        assert_eq!(institutions.get("ins_1").unwrap(), None);
    }
}
