//! Creation-time enrichment
//!
//! Records from the historical page arrive without an authoritative
//! creation time. For each one the enricher fetches the parent transaction
//! and writes the time, plus a freshly computed age, into the window via
//! `update_by_id`. Enrichments run as independent tasks: a slow or failed
//! fetch only leaves its own record showing the loading placeholder, and a
//! record evicted meanwhile makes the update a no-op. Failed fetches are
//! not retried.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use types::operation::OperationRecord;

use crate::age::Clock;
use crate::error::FeedError;
use crate::source::OperationSource;
use crate::window::SharedWindow;

/// Result of one enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Creation time written into the window.
    Applied,
    /// The record left the window before the fetch completed.
    Evicted,
}

#[derive(Clone)]
pub struct Enricher {
    source: Arc<dyn OperationSource>,
    window: SharedWindow,
    clock: Arc<dyn Clock>,
}

impl Enricher {
    pub fn new(source: Arc<dyn OperationSource>, window: SharedWindow, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            window,
            clock,
        }
    }

    /// Fetch the record's transaction and attach its creation time.
    pub async fn enrich(&self, record: &OperationRecord) -> Result<EnrichOutcome, FeedError> {
        let link = record
            .transaction_href()
            .ok_or_else(|| FeedError::MissingTransactionLink(record.id.to_string()))?;

        let detail = self.source.fetch_transaction_detail(link).await?;
        let now = self.clock.now();

        let applied = self
            .window
            .update_by_id(&record.id, |entry| entry.set_created_at(detail.created_at, now));

        if applied {
            Ok(EnrichOutcome::Applied)
        } else {
            Ok(EnrichOutcome::Evicted)
        }
    }

    /// Enrich in the background. Failures are logged, never propagated.
    pub fn spawn(&self, record: Arc<OperationRecord>) -> JoinHandle<()> {
        let enricher = self.clone();
        tokio::spawn(async move {
            match enricher.enrich(&record).await {
                Ok(EnrichOutcome::Applied) => {
                    debug!(operation_id = %record.id, "Creation time attached");
                }
                Ok(EnrichOutcome::Evicted) => {
                    debug!(operation_id = %record.id, "Record left the window before enrichment completed");
                }
                Err(e) => {
                    warn!(
                        operation_id = %record.id,
                        error = %e,
                        "Enrichment failed, record keeps loading placeholder"
                    );
                }
            }
        })
    }

    /// Start one independent enrichment per record.
    pub fn spawn_all<I>(&self, records: I) -> Vec<JoinHandle<()>>
    where
        I: IntoIterator<Item = Arc<OperationRecord>>,
    {
        records.into_iter().map(|record| self.spawn(record)).collect()
    }
}
