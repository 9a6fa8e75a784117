//! Identifier types for ledger entities
//!
//! Identifiers are opaque strings assigned by the query service. They are
//! decoded without validation so that a record with an unexpected id format
//! never fails a whole page; `AccountId::try_new` is available for values
//! supplied by configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::TypeError;

/// Length of an encoded ed25519 public key account id
const ACCOUNT_ID_LEN: usize = 56;
/// Length of an encoded muxed account id
const MUXED_ACCOUNT_ID_LEN: usize = 69;

/// Ledger account identifier (`G...` public key or `M...` muxed account)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create an AccountId without validation
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Try to create an AccountId, checking the strkey shape
    ///
    /// Accepts `G` addresses of 56 characters and `M` addresses of 69
    /// characters drawn from the base32 alphabet.
    pub fn try_new(id: impl Into<String>) -> Result<Self, TypeError> {
        let s = id.into();
        let well_formed = match s.chars().next() {
            Some('G') => s.len() == ACCOUNT_ID_LEN,
            Some('M') => s.len() == MUXED_ACCOUNT_ID_LEN,
            _ => false,
        } && s.chars().all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c));

        if well_formed {
            Ok(Self(s))
        } else {
            Err(TypeError::InvalidAccountId(s))
        }
    }

    /// Get the id string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters used as a compact label
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(4).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for AccountId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Unique identifier of an operation record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cursor value used to page through query results
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PagingToken(String);

impl PagingToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Special cursor that starts a stream at the current ledger
    pub fn now() -> Self {
        Self("now".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PagingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
