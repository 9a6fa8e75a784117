//! Bounded, newest-first window of operation records
//!
//! `FeedWindow` is the plain data structure: a ring of entries with a fixed
//! capacity that only live prepends enforce. `SharedWindow` is the single
//! owner every concurrent task mutates through; each mutation is applied
//! under one lock and publishes a complete [`FeedSnapshot`] on a watch
//! channel, so observers never see a partially applied change.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};
use types::ids::{OperationId, PagingToken};
use types::operation::OperationRecord;

use crate::age::humanize;
use crate::view::FeedRow;

/// A record plus the timing metadata this service derives for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub record: Arc<OperationRecord>,
    /// Authoritative creation time, once known.
    pub created_at: Option<DateTime<Utc>>,
    /// Last computed relative age.
    pub age_text: Option<String>,
}

impl FeedEntry {
    /// Entry whose creation time still has to be looked up.
    pub fn pending(record: Arc<OperationRecord>) -> Self {
        Self {
            record,
            created_at: None,
            age_text: None,
        }
    }

    /// Entry that arrived live; its arrival time is its creation time.
    pub fn live(record: Arc<OperationRecord>, now: DateTime<Utc>) -> Self {
        let mut entry = Self::pending(record);
        entry.set_created_at(now, now);
        entry
    }

    pub fn id(&self) -> &OperationId {
        &self.record.id
    }

    /// Attach a creation time and compute the age immediately.
    pub fn set_created_at(&mut self, created_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.created_at = Some(created_at);
        self.age_text = Some(humanize(created_at, now));
    }

    /// Recompute the age. Returns false when the creation time is unknown.
    pub fn refresh_age(&mut self, now: DateTime<Utc>) -> bool {
        match self.created_at {
            Some(created_at) => {
                self.age_text = Some(humanize(created_at, now));
                true
            }
            None => false,
        }
    }
}

/// Bounded newest-first collection of feed entries.
#[derive(Debug, Clone)]
pub struct FeedWindow {
    entries: VecDeque<FeedEntry>,
    limit: usize,
}

impl FeedWindow {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Replace the contents with a newest-first page.
    ///
    /// No capacity enforcement: the page size was already bounded by the
    /// request.
    pub fn load_initial(&mut self, entries: Vec<FeedEntry>) {
        self.entries = entries.into();
    }

    /// Insert at the front, then evict from the back until within capacity.
    ///
    /// Returns the evicted entries, oldest last.
    pub fn prepend_live(&mut self, entry: FeedEntry) -> Vec<FeedEntry> {
        self.entries.push_front(entry);

        let mut evicted = Vec::new();
        while self.entries.len() > self.limit {
            if let Some(tail) = self.entries.pop_back() {
                evicted.push(tail);
            }
        }
        evicted
    }

    /// Apply `mutation` to the entry with `id`. Absent ids are a no-op.
    ///
    /// Returns whether an entry was found. Never changes order or length.
    pub fn update_by_id<F>(&mut self, id: &OperationId, mutation: F) -> bool
    where
        F: FnOnce(&mut FeedEntry),
    {
        match self.entries.iter_mut().find(|e| e.id() == id) {
            Some(entry) => {
                mutation(entry);
                true
            }
            None => false,
        }
    }

    /// Recompute every known age. Returns how many entries were refreshed.
    pub fn refresh_ages(&mut self, now: DateTime<Utc>) -> usize {
        self.entries
            .iter_mut()
            .map(|e| e.refresh_age(now))
            .filter(|refreshed| *refreshed)
            .count()
    }

    pub fn get(&self, id: &OperationId) -> Option<&FeedEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &OperationId) -> bool {
        self.get(id).is_some()
    }

    /// Entries newest first.
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    /// Oldest (last) entry.
    pub fn oldest(&self) -> Option<&FeedEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Complete, immutable view of the window after one mutation.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    /// Incremented on every published mutation.
    pub version: u64,
    /// Rows newest first.
    pub rows: Vec<FeedRow>,
}

impl FeedSnapshot {
    fn capture(version: u64, window: &FeedWindow) -> Self {
        Self {
            version,
            rows: window.entries().map(FeedRow::from_entry).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row ids newest first.
    pub fn ids(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.id.as_str()).collect()
    }
}

struct WindowState {
    window: FeedWindow,
    version: u64,
    closed: bool,
}

struct Shared {
    state: Mutex<WindowState>,
    snapshots: watch::Sender<FeedSnapshot>,
}

/// Shared handle to the one feed window.
///
/// Cloning is cheap; all clones mutate the same window. After [`close`]
/// every mutation is ignored.
///
/// [`close`]: SharedWindow::close
#[derive(Clone)]
pub struct SharedWindow {
    inner: Arc<Shared>,
}

impl SharedWindow {
    pub fn new(limit: usize) -> Self {
        let (snapshots, _) = watch::channel(FeedSnapshot::default());
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(WindowState {
                    window: FeedWindow::new(limit),
                    version: 0,
                    closed: false,
                }),
                snapshots,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish while the lock is held so snapshot order matches mutation order.
    fn publish(&self, state: &mut WindowState) {
        state.version += 1;
        let snapshot = FeedSnapshot::capture(state.version, &state.window);
        self.inner.snapshots.send_replace(snapshot);
    }

    pub fn load_initial(&self, records: Vec<Arc<OperationRecord>>) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        let count = records.len();
        state
            .window
            .load_initial(records.into_iter().map(FeedEntry::pending).collect());
        self.publish(&mut state);
        info!(records = count, "Initial page loaded into window");
    }

    /// Prepend a live entry. Returns false when the window is closed.
    pub fn prepend_live(&self, entry: FeedEntry) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        let id = entry.id().clone();
        let evicted = state.window.prepend_live(entry);
        self.publish(&mut state);
        for tail in &evicted {
            debug!(operation_id = %id, evicted_id = %tail.id(), "Evicted oldest entry");
        }
        true
    }

    /// Mutate the entry with `id` in place if it is still present.
    pub fn update_by_id<F>(&self, id: &OperationId, mutation: F) -> bool
    where
        F: FnOnce(&mut FeedEntry),
    {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        let found = state.window.update_by_id(id, mutation);
        if found {
            self.publish(&mut state);
        }
        found
    }

    /// Recompute every known age and publish.
    pub fn refresh_ages(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.lock();
        if state.closed {
            return 0;
        }
        let refreshed = state.window.refresh_ages(now);
        if refreshed > 0 {
            self.publish(&mut state);
        }
        refreshed
    }

    /// Freeze the window. Later mutations are ignored.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Paging token of the oldest entry, the cursor for older pages.
    pub fn oldest_paging_token(&self) -> Option<PagingToken> {
        self.lock()
            .window
            .oldest()
            .map(|e| e.record.paging_token.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().window.is_empty()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.inner.snapshots.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{manage_data, payment, OTHER, WATCHED};
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 3, 20, 19, 50, 52).unwrap()
    }

    fn entry(id: &str) -> FeedEntry {
        FeedEntry::pending(Arc::new(payment(id, OTHER, WATCHED)))
    }

    fn ids(window: &FeedWindow) -> Vec<String> {
        window.entries().map(|e| e.id().to_string()).collect()
    }

    fn full_window(limit: usize) -> FeedWindow {
        let mut window = FeedWindow::new(limit);
        window.load_initial((0..limit).rev().map(|i| entry(&i.to_string())).collect());
        window
    }

    #[test]
    fn test_load_initial_preserves_order() {
        let window = full_window(10);
        assert_eq!(window.len(), 10);
        assert_eq!(ids(&window)[0], "9");
        assert_eq!(ids(&window)[9], "0");
    }

    #[test]
    fn test_load_initial_does_not_enforce_capacity() {
        let mut window = FeedWindow::new(2);
        window.load_initial(vec![entry("c"), entry("b"), entry("a")]);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_prepend_evicts_tail_at_capacity() {
        let mut window = full_window(10);

        let evicted = window.prepend_live(entry("new"));

        assert_eq!(window.len(), 10);
        assert_eq!(ids(&window)[0], "new");
        assert_eq!(ids(&window)[1], "9");
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id().as_str(), "0");
        assert!(!window.contains(&OperationId::new("0")));
    }

    #[test]
    fn test_prepend_below_capacity_keeps_everything() {
        let mut window = FeedWindow::new(10);
        window.load_initial(vec![entry("b"), entry("a")]);

        let evicted = window.prepend_live(entry("c"));

        assert!(evicted.is_empty());
        assert_eq!(ids(&window), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_update_by_id_present() {
        let mut window = full_window(3);
        let created = now() - ChronoDuration::minutes(5);

        let found = window.update_by_id(&OperationId::new("1"), |e| e.set_created_at(created, now()));

        assert!(found);
        let updated = window.get(&OperationId::new("1")).unwrap();
        assert_eq!(updated.created_at, Some(created));
        assert_eq!(updated.age_text.as_deref(), Some("5 minutes"));
        assert_eq!(ids(&window), vec!["2", "1", "0"]);
    }

    #[test]
    fn test_update_by_id_absent_is_noop() {
        let mut window = full_window(3);
        let before = ids(&window);

        let found = window.update_by_id(&OperationId::new("evicted"), |e| {
            e.set_created_at(now(), now())
        });

        assert!(!found);
        assert_eq!(ids(&window), before);
        assert!(window.entries().all(|e| e.created_at.is_none()));
    }

    #[test]
    fn test_refresh_ages_skips_unknown_creation_time() {
        let mut window = FeedWindow::new(3);
        window.load_initial(vec![entry("b"), entry("a")]);
        window.update_by_id(&OperationId::new("a"), |e| {
            e.set_created_at(now() - ChronoDuration::hours(3), now())
        });

        let refreshed = window.refresh_ages(now() + ChronoDuration::hours(1));

        assert_eq!(refreshed, 1);
        let a = window.get(&OperationId::new("a")).unwrap();
        assert_eq!(a.age_text.as_deref(), Some("4 hours"));
        assert!(window.get(&OperationId::new("b")).unwrap().age_text.is_none());
    }

    #[test]
    fn test_shared_window_publishes_snapshots() {
        let shared = SharedWindow::new(2);
        let rx = shared.subscribe();

        shared.load_initial(vec![
            Arc::new(manage_data("b", "key-b")),
            Arc::new(manage_data("a", "key-a")),
        ]);
        assert_eq!(rx.borrow().version, 1);
        assert_eq!(rx.borrow().ids(), vec!["b", "a"]);

        shared.prepend_live(FeedEntry::live(Arc::new(manage_data("c", "key-c")), now()));
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.ids(), vec!["c", "b"]);
        assert_eq!(snapshot.rows[0].age_text, "a few seconds");
        assert_eq!(snapshot.rows[1].age_text, "Loading...");
    }

    #[test]
    fn test_shared_window_absent_update_publishes_nothing() {
        let shared = SharedWindow::new(2);
        shared.load_initial(vec![Arc::new(manage_data("a", "key"))]);

        let found = shared.update_by_id(&OperationId::new("zzz"), |e| e.set_created_at(now(), now()));

        assert!(!found);
        assert_eq!(shared.snapshot().version, 1);
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn test_closed_window_ignores_mutations() {
        let shared = SharedWindow::new(2);
        shared.load_initial(vec![Arc::new(manage_data("a", "key"))]);
        shared.close();

        assert!(!shared.prepend_live(FeedEntry::live(Arc::new(manage_data("b", "key")), now())));
        assert!(!shared.update_by_id(&OperationId::new("a"), |e| e.set_created_at(now(), now())));
        assert_eq!(shared.refresh_ages(now()), 0);
        assert_eq!(shared.snapshot().version, 1);
        assert!(shared.is_closed());
    }

    #[test]
    fn test_huge_limit_allocates_lazily() {
        for limit in [usize::MAX / 2, usize::MAX] {
            let shared = SharedWindow::new(limit);
            shared.load_initial(vec![Arc::new(manage_data("a", "k"))]);
            assert!(shared.prepend_live(FeedEntry::live(Arc::new(manage_data("b", "k")), now())));
            assert_eq!(shared.snapshot().ids(), vec!["b", "a"]);
        }
    }

    #[test]
    fn test_oldest_paging_token() {
        let shared = SharedWindow::new(3);
        assert!(shared.oldest_paging_token().is_none());

        shared.load_initial(vec![Arc::new(manage_data("b", "k")), Arc::new(manage_data("a", "k"))]);
        assert_eq!(shared.oldest_paging_token(), Some(PagingToken::new("pt-a")));
    }
}
