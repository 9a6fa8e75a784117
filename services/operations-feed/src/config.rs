//! Feed configuration
//!
//! Defaults match the widget the feed backs: ten rows, a ten second age
//! refresh, unfiltered global scope. Every field can be overridden from the
//! environment.

use std::env;
use std::time::Duration;

use types::ids::AccountId;

/// Event name used for newly created operations on the live emitter.
pub const DEFAULT_EVENT_NAME: &str = "newOperation";

/// Largest page the query service returns, and so the largest window.
pub const MAX_LIMIT: usize = 200;

/// Errors in feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("limit must be a positive integer")]
    ZeroLimit,

    #[error("limit {0} exceeds the maximum page size of {}", MAX_LIMIT)]
    LimitTooLarge(usize),

    #[error("refresh interval must be greater than zero")]
    ZeroRefreshInterval,

    #[error("invalid account filter: {0}")]
    InvalidAccount(String),
}

/// Configuration for a single operations feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL of the ledger query service.
    pub horizon_url: String,
    /// Restricts the initial fetch and live relevance to one account.
    pub account_filter: Option<AccountId>,
    /// Window capacity and page size of the initial fetch.
    pub limit: usize,
    /// Period of the age refresh timer.
    pub refresh_interval: Duration,
    /// Live emitter event carrying new operation records.
    pub event_name: String,
    /// Free-form label shown in the feed heading.
    pub label: String,
    /// Whether the binary should stream live operations from the query service.
    pub stream_live: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            horizon_url: "https://horizon.stellar.org".to_string(),
            account_filter: None,
            limit: 10,
            refresh_interval: Duration::from_millis(10_000),
            event_name: DEFAULT_EVENT_NAME.to_string(),
            label: String::new(),
            stream_live: true,
        }
    }
}

impl FeedConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `FEED_HORIZON_URL` (default: https://horizon.stellar.org)
    /// - `FEED_ACCOUNT` (default: unset, global feed)
    /// - `FEED_LIMIT` (default: 10)
    /// - `FEED_REFRESH_INTERVAL_MS` (default: 10000)
    /// - `FEED_EVENT_NAME` (default: newOperation)
    /// - `FEED_LABEL` (default: empty)
    /// - `FEED_STREAM_LIVE` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let account_filter = match env::var("FEED_ACCOUNT") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                AccountId::try_new(raw.trim())
                    .map_err(|_| ConfigError::InvalidAccount(raw.clone()))?,
            ),
            _ => None,
        };

        Ok(Self {
            horizon_url: env::var("FEED_HORIZON_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.horizon_url),

            account_filter,

            limit: env::var("FEED_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.limit),

            refresh_interval: env::var("FEED_REFRESH_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.refresh_interval),

            event_name: env::var("FEED_EVENT_NAME").unwrap_or(defaults.event_name),

            label: env::var("FEED_LABEL").unwrap_or(defaults.label),

            stream_live: env::var("FEED_STREAM_LIVE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.stream_live),
        })
    }

    /// Reject configurations the feed cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if self.limit > MAX_LIMIT {
            return Err(ConfigError::LimitTooLarge(self.limit));
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        Ok(())
    }
}
