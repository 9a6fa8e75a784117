//! Error types for ledger domain values
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Errors raised while constructing domain values from untrusted input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Credit asset of type {asset_type} is missing its code")]
    MissingAssetCode { asset_type: String },
}
