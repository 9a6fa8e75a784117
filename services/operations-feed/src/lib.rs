//! Operations Feed Service
//!
//! Maintains a bounded, newest-first window of ledger operations for a
//! consumer:
//! - Initial page of the newest records (global or for one account)
//! - Asynchronous creation-time enrichment per record
//! - Live records pushed through an in-process emitter, filtered by account
//! - Relative ages refreshed on a fixed period
//! - Per-kind human summaries for display
//!
//! # Architecture
//!
//! ```text
//!  Query service (HTTP)          Query service (SSE)
//!        │                             │
//!  ┌─────▼──────┐               ┌──────▼─────┐
//!  │ Controller │               │   Stream   │
//!  └──┬──────┬──┘               └──────┬─────┘
//!     │      │                         │
//!     │ ┌────▼─────┐            ┌──────▼─────┐
//!     │ │ Enricher │            │  Emitter   │
//!     │ └────┬─────┘            └──────┬─────┘
//!     │      │                  ┌──────▼─────┐
//!     │      │                  │   Filter   │
//!     │      │                  └──────┬─────┘
//!  ┌──▼──────▼─────────────────────────▼──┐
//!  │        Window  ◄── Age ticker        │
//!  └──────────────────┬───────────────────┘
//!                     │ snapshots
//!                ┌────▼────┐
//!                │  View   │
//!                └─────────┘
//! ```

pub mod age;
pub mod config;
pub mod controller;
pub mod emitter;
pub mod enricher;
pub mod error;
pub mod filter;
pub mod horizon;
pub mod interpreter;
pub mod source;
pub mod stream;
pub mod view;
pub mod window;

#[cfg(test)]
mod test_support;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
