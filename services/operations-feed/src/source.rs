//! Seams to the external collaborators
//!
//! `OperationSource` is the ledger query service (paged history and
//! transaction detail); `LiveSource` pushes newly created records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use types::ids::{AccountId, PagingToken};
use types::operation::OperationRecord;

use crate::emitter::Subscription;
use crate::error::FeedError;

/// Which operations a page covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Global,
    Account(AccountId),
}

impl Scope {
    pub fn from_filter(account: Option<&AccountId>) -> Self {
        match account {
            Some(account) => Scope::Account(account.clone()),
            None => Scope::Global,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// Parameters of one historical page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub scope: Scope,
    pub order: Order,
    pub limit: usize,
    pub cursor: Option<PagingToken>,
}

impl PageRequest {
    /// Newest `limit` records of `scope`.
    pub fn latest(scope: Scope, limit: usize) -> Self {
        Self {
            scope,
            order: Order::Desc,
            limit,
            cursor: None,
        }
    }
}

/// Parent transaction detail; only the creation time is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionDetail {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub ledger: Option<u64>,
}

#[async_trait]
pub trait OperationSource: Send + Sync {
    /// Fetch one page of records in the requested order.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<OperationRecord>, FeedError>;

    /// Fetch the transaction a record links to.
    async fn fetch_transaction_detail(&self, link: &str) -> Result<TransactionDetail, FeedError>;
}

pub trait LiveSource: Send + Sync {
    /// Register a listener for `event_name`.
    fn subscribe(&self, event_name: &str) -> Result<Subscription, FeedError>;
}
