//! Feed lifecycle orchestration
//!
//! `SyncController` drives one feed through
//! `Idle -> LoadingInitial -> Live -> Stopped`:
//!
//! 1. Fetch the newest `limit` records (account-scoped or global).
//! 2. Load them into the window and start one enrichment per record.
//! 3. Subscribe to live events; relevant ones are prepended with the
//!    arrival time as their creation time.
//!
//! A failed initial fetch leaves the controller in `LoadingInitial` with an
//! empty feed. `stop()` closes the window first, so nothing in flight can
//! mutate it afterwards, then cancels the age ticker and releases the live
//! subscription.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use types::ids::PagingToken;

use crate::age::{AgeTicker, Clock};
use crate::config::FeedConfig;
use crate::emitter::Subscription;
use crate::enricher::Enricher;
use crate::error::FeedError;
use crate::filter::{LiveDecision, RelevanceFilter};
use crate::source::{LiveSource, OperationSource, PageRequest, Scope};
use crate::view::heading;
use crate::window::{FeedEntry, FeedSnapshot, SharedWindow};

/// Lifecycle state of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    LoadingInitial,
    Live,
    Stopped,
}

impl fmt::Display for FeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedState::Idle => "idle",
            FeedState::LoadingInitial => "loading_initial",
            FeedState::Live => "live",
            FeedState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

struct LiveTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct SyncController {
    config: FeedConfig,
    source: Arc<dyn OperationSource>,
    live: Arc<dyn LiveSource>,
    clock: Arc<dyn Clock>,
    filter: RelevanceFilter,
    window: SharedWindow,
    state: FeedState,
    ticker: Option<AgeTicker>,
    enrichments: Vec<JoinHandle<()>>,
    live_task: Option<LiveTask>,
    paging_token: Option<PagingToken>,
}

impl SyncController {
    /// Build an idle controller. Rejects configurations `validate` rejects.
    pub fn new(
        config: FeedConfig,
        source: Arc<dyn OperationSource>,
        live: Arc<dyn LiveSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FeedError> {
        config.validate()?;
        let window = SharedWindow::new(config.limit);
        let filter = RelevanceFilter::new(config.account_filter.clone());
        Ok(Self {
            config,
            source,
            live,
            clock,
            filter,
            window,
            state: FeedState::Idle,
            ticker: None,
            enrichments: Vec::new(),
            live_task: None,
            paging_token: None,
        })
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn window(&self) -> &SharedWindow {
        &self.window
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.window.snapshot()
    }

    /// Receiver notified after every window mutation.
    pub fn subscribe_snapshots(&self) -> watch::Receiver<FeedSnapshot> {
        self.window.subscribe()
    }

    /// Whether a live subscription is held. False after a failed
    /// registration or once stopped.
    pub fn is_receiving_live(&self) -> bool {
        self.live_task.is_some()
    }

    /// Paging token of the oldest record of the initial page.
    pub fn paging_token(&self) -> Option<&PagingToken> {
        self.paging_token.as_ref()
    }

    pub fn heading(&self) -> String {
        heading(&self.config.label, self.config.account_filter.as_ref())
    }

    /// Run the initial load and go live.
    ///
    /// Only valid from `Idle`. On a failed page fetch the controller stays in
    /// `LoadingInitial` and the error is returned. A failed live registration
    /// is logged and the feed still goes `Live`, showing the initial page
    /// without live updates.
    pub async fn start(&mut self) -> Result<(), FeedError> {
        if self.state != FeedState::Idle {
            return Err(FeedError::InvalidState {
                from: self.state.to_string(),
                action: "start".to_string(),
            });
        }

        self.state = FeedState::LoadingInitial;
        self.ticker = Some(AgeTicker::spawn(
            self.window.clone(),
            self.clock.clone(),
            self.config.refresh_interval,
        ));

        let scope = Scope::from_filter(self.config.account_filter.as_ref());
        let request = PageRequest::latest(scope, self.config.limit);
        info!(
            account = ?self.config.account_filter.as_ref().map(|a| a.as_str()),
            limit = self.config.limit,
            "Fetching initial page"
        );

        let records = match self.source.fetch_page(&request).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Initial page fetch failed");
                return Err(e);
            }
        };

        let records: Vec<_> = records.into_iter().map(Arc::new).collect();
        self.window.load_initial(records.clone());
        self.paging_token = self.window.oldest_paging_token();

        let enricher = Enricher::new(self.source.clone(), self.window.clone(), self.clock.clone());
        self.enrichments = enricher.spawn_all(records);

        match self.live.subscribe(&self.config.event_name) {
            Ok(subscription) => {
                self.live_task = Some(self.spawn_live_loop(subscription));
            }
            Err(e) => {
                // Same as a channel closing later: the page stays, nothing is reopened.
                error!(
                    event = %self.config.event_name,
                    error = %e,
                    "Live subscription failed, feed continues without live events"
                );
            }
        }

        self.state = FeedState::Live;
        info!(
            records = self.window.len(),
            event = %self.config.event_name,
            receiving_live = self.live_task.is_some(),
            "Feed is live"
        );
        Ok(())
    }

    fn spawn_live_loop(&self, mut subscription: Subscription) -> LiveTask {
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
        let window = self.window.clone();
        let filter = self.filter.clone();
        let clock = self.clock.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    event = subscription.next() => {
                        let Some(record) = event else {
                            warn!(
                                event = %subscription.event_name(),
                                "Live channel closed, not reopening"
                            );
                            break;
                        };
                        match filter.decide(&record) {
                            LiveDecision::Accepted => {
                                window.prepend_live(FeedEntry::live(record, clock.now()));
                            }
                            LiveDecision::Discarded => {
                                trace!(operation_id = %record.id, "Discarded unrelated live event");
                            }
                        }
                    }
                }
            }
            subscription.release();
        });

        LiveTask { shutdown, handle }
    }

    /// Tear the feed down. Idempotent.
    ///
    /// When this returns the window is frozen, the ticker is cancelled and
    /// the live subscription has been released.
    pub async fn stop(&mut self) {
        if self.state == FeedState::Stopped {
            return;
        }

        self.window.close();

        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }

        for handle in self.enrichments.drain(..) {
            handle.abort();
        }

        if let Some(task) = self.live_task.take() {
            let _ = task.shutdown.send(());
            if let Err(e) = task.handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Live loop ended abnormally");
                }
            }
        }

        debug!(from = %self.state, "Feed stopped");
        self.state = FeedState::Stopped;
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.window.close();
        for handle in self.enrichments.drain(..) {
            handle.abort();
        }
        if let Some(task) = self.live_task.take() {
            task.handle.abort();
        }
    }
}
