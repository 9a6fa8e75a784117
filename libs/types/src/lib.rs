//! Types library for the ledger operations feed
//!
//! Core type definitions for operation records returned by a ledger query
//! service. Records are decoded once and never mutated afterwards; all
//! derived state (creation time, age text) lives in the feed service.
//!
//! # Modules
//! - `ids`: Identifiers (AccountId, OperationId, PagingToken)
//! - `numeric`: Decimal amounts and their display formatting
//! - `asset`: Native and credit assets
//! - `operation`: Operation records and the per-kind payload union
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod asset;
pub mod operation;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::asset::*;
    pub use crate::operation::*;
    pub use crate::errors::*;
}
