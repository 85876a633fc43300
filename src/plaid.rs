//! The client for the Plaid financial data aggregation API.
//!
//! Plaid supplies transaction deltas through `/transactions/sync`: each page
//! carries added and removed records, a continuation cursor and a `has_more`
//! flag. The sync engine consumes this module through the [PlaidApi] trait so
//! tests can script upstream behaviour without a network.

use std::{future::Future, str::FromStr, time::Duration};

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::Error;

/// The timeout applied to every Plaid API request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The Plaid environment to send API requests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// The sandbox environment with fabricated bank data.
    Sandbox,
    /// The development environment with live data and test credentials.
    Development,
    /// The production environment.
    Production,
}

impl Environment {
    /// The base URL for API requests to this environment.
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => "https://sandbox.plaid.com",
            Environment::Development => "https://development.plaid.com",
            Environment::Production => "https://production.plaid.com",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "sandbox" => Ok(Environment::Sandbox),
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(format!("unrecognized environment {other:?}")),
        }
    }
}

/// One transaction reported by Plaid as added.
///
/// Plaid owns the payload schema, so everything except the transaction ID is
/// kept as opaque JSON and stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddedTransaction {
    /// Plaid's unique identifier for the transaction.
    pub transaction_id: String,

    /// The rest of the transaction payload, untouched.
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// One transaction reported by Plaid as removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedTransaction {
    /// Plaid's unique identifier for the removed transaction.
    pub transaction_id: String,
}

/// One response unit from `/transactions/sync`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaPage {
    /// Transactions added since the request cursor.
    pub added: Vec<AddedTransaction>,
    /// Transactions removed since the request cursor.
    pub removed: Vec<RemovedTransaction>,
    /// The cursor marking the end of this page.
    pub next_cursor: String,
    /// Whether further pages are available right now.
    pub has_more: bool,
}

/// The result of exchanging a public token from the link flow.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenExchange {
    /// The long-lived access token for the linked item.
    pub access_token: String,
    /// Plaid's identifier for the linked item.
    pub item_id: String,
}

/// Display metadata for an institution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstitutionMetadata {
    /// Plaid's identifier for the institution.
    pub institution_id: String,
    /// The institution's display name.
    pub name: String,
    /// A base64 encoded PNG logo, when Plaid has one.
    pub logo: Option<String>,
}

/// The operations the application needs from the Plaid API.
///
/// The sync engine and the route handlers are generic over this trait; the
/// production implementation is [PlaidClient].
pub trait PlaidApi: Send + Sync {
    /// Create a token for the client-side link flow.
    fn create_link_token(&self) -> impl Future<Output = Result<String, Error>> + Send;

    /// Exchange a public token from a completed link flow for an access token.
    fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> impl Future<Output = Result<TokenExchange, Error>> + Send;

    /// Fetch one page of transaction deltas for the item behind
    /// `access_token`.
    ///
    /// `cursor` must be `None` on the very first sync of an item: Plaid
    /// treats an absent cursor as "from the beginning" but rejects an empty
    /// string as malformed, so the two must never be conflated.
    fn transactions_sync(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<DeltaPage, Error>> + Send;

    /// Fetch display metadata for an institution, including its logo.
    fn institution_by_id(
        &self,
        institution_id: &str,
    ) -> impl Future<Output = Result<InstitutionMetadata, Error>> + Send;
}

#[derive(Serialize)]
struct TransactionsSyncRequest<'a> {
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

#[derive(Serialize)]
struct LinkTokenCreateRequest<'a> {
    client_name: &'a str,
    language: &'a str,
    country_codes: [&'a str; 1],
    user: LinkTokenUser<'a>,
    products: [&'a str; 1],
}

#[derive(Serialize)]
struct LinkTokenUser<'a> {
    client_user_id: &'a str,
}

#[derive(Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Serialize)]
struct PublicTokenExchangeRequest<'a> {
    public_token: &'a str,
}

#[derive(Serialize)]
struct InstitutionsGetByIdRequest<'a> {
    institution_id: &'a str,
    country_codes: [&'a str; 1],
    options: InstitutionsGetByIdOptions,
}

#[derive(Serialize)]
struct InstitutionsGetByIdOptions {
    include_optional_metadata: bool,
}

#[derive(Deserialize)]
struct InstitutionsGetByIdResponse {
    institution: InstitutionMetadata,
}

/// The HTTP client for the Plaid API.
#[derive(Debug, Clone)]
pub struct PlaidClient {
    client: reqwest::Client,
    base_url: &'static str,
}

impl PlaidClient {
    /// Create a client for `environment` authenticated with `client_id` and
    /// `secret`.
    ///
    /// # Errors
    /// Returns an [Error::Upstream] if the credentials cannot be used as HTTP
    /// header values or the underlying HTTP client cannot be built.
    pub fn new(environment: Environment, client_id: &str, secret: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "PLAID-CLIENT-ID",
            HeaderValue::from_str(client_id)
                .map_err(|error| Error::Upstream(format!("invalid client ID header: {error}")))?,
        );
        headers.insert(
            "PLAID-SECRET",
            HeaderValue::from_str(secret)
                .map_err(|error| Error::Upstream(format!("invalid secret header: {error}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| Error::Upstream(format!("could not build HTTP client: {error}")))?;

        Ok(Self {
            client,
            base_url: environment.base_url(),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|error| Error::Upstream(format!("{path}: {error}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| Error::Upstream(format!("{path}: {error}")))?;

        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "{path} returned {status}: {text}"
            )));
        }

        serde_json::from_str(&text)
            .map_err(|error| Error::Upstream(format!("malformed response from {path}: {error}")))
    }
}

impl PlaidApi for PlaidClient {
    fn create_link_token(&self) -> impl Future<Output = Result<String, Error>> + Send {
        async move {
            let response: LinkTokenCreateResponse = self
                .post(
                    "/link/token/create",
                    &LinkTokenCreateRequest {
                        client_name: "Expense Tracker",
                        language: "en",
                        country_codes: ["US"],
                        user: LinkTokenUser { client_user_id: "1" },
                        products: ["transactions"],
                    },
                )
                .await?;

            Ok(response.link_token)
        }
    }

    fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> impl Future<Output = Result<TokenExchange, Error>> + Send {
        async move {
            self.post(
                "/item/public_token/exchange",
                &PublicTokenExchangeRequest { public_token },
            )
            .await
        }
    }

    fn transactions_sync(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<DeltaPage, Error>> + Send {
        async move {
            self.post(
                "/transactions/sync",
                &TransactionsSyncRequest {
                    access_token,
                    cursor,
                },
            )
            .await
        }
    }

    fn institution_by_id(
        &self,
        institution_id: &str,
    ) -> impl Future<Output = Result<InstitutionMetadata, Error>> + Send {
        async move {
            let response: InstitutionsGetByIdResponse = self
                .post(
                    "/institutions/get_by_id",
                    &InstitutionsGetByIdRequest {
                        institution_id,
                        country_codes: ["US"],
                        options: InstitutionsGetByIdOptions {
                            include_optional_metadata: true,
                        },
                    },
                )
                .await?;

            Ok(response.institution)
        }
    }
}
