//! Error taxonomy for the operations feed
//!
//! Only genuine failures are errors. A live event that does not concern the
//! configured account is a [`crate::filter::LiveDecision::Discarded`] value,
//! and a record of an unknown type simply has no summary.

use thiserror::Error;

use crate::config::ConfigError;

/// Central error type for the feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Transport-level failure talking to the query service.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Query service answered with a non-success status.
    #[error("query service returned HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// Response body could not be decoded.
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Record has no link to its parent transaction.
    #[error("operation {0} has no transaction link")]
    MissingTransactionLink(String),

    /// Live-event registration failed or the channel closed.
    #[error("live subscription failed: {0}")]
    Subscription(String),

    /// Operation not allowed in the controller's current state.
    #[error("invalid state transition from {from} on {action}")]
    InvalidState { from: String, action: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
