//! Record builders shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use types::operation::OperationRecord;

use crate::age::Clock;
use crate::error::FeedError;
use crate::source::{OperationSource, PageRequest, TransactionDetail};

pub const WATCHED: &str = "GWATCHEDACCOUNT";
pub const OTHER: &str = "GSOMEBODYELSE";

pub fn record_with(id: &str, source: &str, kind: &str, payload: Value) -> OperationRecord {
    let mut raw = json!({
        "id": id,
        "paging_token": format!("pt-{}", id),
        "source_account": source,
        "type": kind,
        "_links": {
            "self": { "href": format!("https://horizon.example/operations/{}", id) },
            "transaction": { "href": format!("https://horizon.example/transactions/tx-{}", id) }
        }
    });
    if let (Value::Object(target), Value::Object(extra)) = (&mut raw, payload) {
        target.extend(extra);
    }
    serde_json::from_value(raw).unwrap()
}

pub fn payment(id: &str, source: &str, to: &str) -> OperationRecord {
    record_with(
        id,
        source,
        "payment",
        json!({
            "from": source,
            "to": to,
            "amount": "10.0000000",
            "asset_type": "native"
        }),
    )
}

pub fn manage_data(id: &str, name: &str) -> OperationRecord {
    record_with(id, OTHER, "manage_data", json!({ "name": name, "value": null }))
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 3, 20, 19, 50, 52).unwrap()
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn tx_link(id: &str) -> String {
    format!("https://horizon.example/transactions/tx-{}", id)
}

/// In-memory query service with per-link delays and failures.
#[derive(Default)]
pub struct MockSource {
    pub page: Mutex<Option<Result<Vec<OperationRecord>, FeedError>>>,
    pub details: Mutex<HashMap<String, (Duration, Result<TransactionDetail, FeedError>)>>,
    pub requests: Mutex<Vec<PageRequest>>,
}

impl MockSource {
    pub fn with_page(records: Vec<OperationRecord>) -> Self {
        let source = Self::default();
        *source.page.lock().unwrap() = Some(Ok(records));
        source
    }

    pub fn detail(&self, id: &str, delay: Duration, created_at: DateTime<Utc>) {
        self.details.lock().unwrap().insert(
            tx_link(id),
            (
                delay,
                Ok(TransactionDetail {
                    created_at,
                    hash: None,
                    ledger: None,
                }),
            ),
        );
    }

    pub fn fail_detail(&self, id: &str) {
        self.details.lock().unwrap().insert(
            tx_link(id),
            (
                Duration::ZERO,
                Err(FeedError::Http {
                    url: tx_link(id),
                    status: 500,
                }),
            ),
        );
    }
}

#[async_trait]
impl OperationSource for MockSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<OperationRecord>, FeedError> {
        self.requests.lock().unwrap().push(request.clone());
        self.page.lock().unwrap().clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_transaction_detail(&self, link: &str) -> Result<TransactionDetail, FeedError> {
        let entry = self.details.lock().unwrap().get(link).cloned();
        match entry {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Err(FeedError::Http {
                url: link.to_string(),
                status: 404,
            }),
        }
    }
}
