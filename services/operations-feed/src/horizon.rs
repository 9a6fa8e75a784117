//! HTTP client for the ledger query service
//!
//! Pages are read from `/operations` (global) or
//! `/accounts/{id}/operations` (account scoped). Each record's parent
//! transaction is read from the absolute link embedded in the record.
//! No request timeouts are configured: an unreachable endpoint leaves the
//! affected call pending instead of failing it.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};
use types::operation::OperationRecord;

use crate::error::FeedError;
use crate::source::{OperationSource, PageRequest, Scope, TransactionDetail};

#[derive(Deserialize)]
struct Page {
    #[serde(rename = "_embedded")]
    embedded: Embedded,
}

#[derive(Deserialize)]
struct Embedded {
    records: Vec<OperationRecord>,
}

#[derive(Clone)]
pub struct HorizonClient {
    http: Client,
    base_url: String,
}

impl HorizonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Collection URL of the operations in `scope`.
    pub fn operations_url(&self, scope: &Scope) -> String {
        match scope {
            Scope::Global => format!("{}/operations", self.base_url),
            Scope::Account(account) => format!("{}/accounts/{}/operations", self.base_url, account),
        }
    }

    /// Full URL of one page request.
    pub fn page_url(&self, request: &PageRequest) -> String {
        let mut url = format!(
            "{}?order={}&limit={}",
            self.operations_url(&request.scope),
            request.order.as_str(),
            request.limit
        );
        if let Some(cursor) = &request.cursor {
            url.push_str("&cursor=");
            url.push_str(cursor.as_str());
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let response = self.http.get(url).send().await.map_err(|e| FeedError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| FeedError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl OperationSource for HorizonClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<OperationRecord>, FeedError> {
        let url = self.page_url(request);
        debug!(%url, "Fetching operations page");

        match self.get_json::<Page>(&url).await {
            Ok(page) => Ok(page.embedded.records),
            Err(e) => {
                error!(%url, error = %e, "Operations page fetch failed");
                Err(e)
            }
        }
    }

    async fn fetch_transaction_detail(&self, link: &str) -> Result<TransactionDetail, FeedError> {
        self.get_json::<TransactionDetail>(link).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Order;
    use types::ids::{AccountId, PagingToken};

    fn client() -> HorizonClient {
        HorizonClient::new("https://horizon.example/")
    }

    #[test]
    fn test_global_page_url() {
        let url = client().page_url(&PageRequest::latest(Scope::Global, 10));
        assert_eq!(url, "https://horizon.example/operations?order=desc&limit=10");
    }

    #[test]
    fn test_account_page_url_with_cursor() {
        let request = PageRequest {
            scope: Scope::Account(AccountId::new("GWATCHED")),
            order: Order::Asc,
            limit: 5,
            cursor: Some(PagingToken::new("12884905985")),
        };
        assert_eq!(
            client().page_url(&request),
            "https://horizon.example/accounts/GWATCHED/operations?order=asc&limit=5&cursor=12884905985"
        );
    }

    #[test]
    fn test_page_body_decodes() {
        let body = serde_json::json!({
            "_links": { "self": { "href": "https://horizon.example/operations?order=desc&limit=2" } },
            "_embedded": {
                "records": [
                    {
                        "id": "2", "paging_token": "2", "source_account": "GA", "type": "manage_data",
                        "name": "k", "value": null,
                        "_links": { "transaction": { "href": "https://horizon.example/transactions/b" } }
                    },
                    {
                        "id": "1", "paging_token": "1", "source_account": "GA", "type": "inflation",
                        "_links": { "transaction": { "href": "https://horizon.example/transactions/a" } }
                    }
                ]
            }
        });
        let page: Page = serde_json::from_value(body).unwrap();
        assert_eq!(page.embedded.records.len(), 2);
        assert_eq!(page.embedded.records[0].id.as_str(), "2");
        assert_eq!(page.embedded.records[1].type_name(), "inflation");
    }

    #[test]
    fn test_transaction_detail_decodes() {
        let detail: TransactionDetail = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "hash": "abc",
            "ledger": 7,
            "created_at": "2017-03-20T19:50:52Z",
            "source_account": "GA"
        }))
        .unwrap();
        assert_eq!(detail.created_at.to_rfc3339(), "2017-03-20T19:50:52+00:00");
        assert_eq!(detail.ledger, Some(7));
    }
}
