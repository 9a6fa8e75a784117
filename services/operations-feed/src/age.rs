//! Relative age of feed entries
//!
//! `humanize` renders the distance between a record's creation time and
//! now as a short phrase with no suffix ("5 minutes", not "5 minutes ago").
//! `AgeTicker` owns the periodic task that refreshes every known age in the
//! window; dropping or stopping it cancels the task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::window::SharedWindow;

/// Shortest period the age ticker runs with.
pub const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(1);

/// Text shown while a record's creation time is unknown.
pub const LOADING_PLACEHOLDER: &str = "Loading...";

// Rounded-unit thresholds at which the next larger unit takes over.
const SECONDS_THRESHOLD: f64 = 45.0;
const MINUTES_THRESHOLD: f64 = 45.0;
const HOURS_THRESHOLD: f64 = 22.0;
const DAYS_THRESHOLD: f64 = 26.0;
const MONTHS_THRESHOLD: f64 = 11.0;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Human-relative duration between `created_at` and `now`, without suffix.
///
/// The direction is ignored, so a creation time slightly in the future
/// (clock skew) still renders as "a few seconds".
pub fn humanize(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let ms = (now - created_at).num_milliseconds().unsigned_abs() as f64;

    let seconds = (ms / 1_000.0).round();
    let minutes = (ms / 60_000.0).round();
    let hours = (ms / 3_600_000.0).round();
    let fractional_days = ms / 86_400_000.0;
    let days = fractional_days.round();
    // 400 years hold 146097 days and 4800 months
    let fractional_months = fractional_days * 4_800.0 / 146_097.0;
    let months = fractional_months.round();
    let years = (fractional_months / 12.0).round();

    if seconds < SECONDS_THRESHOLD {
        "a few seconds".to_string()
    } else if minutes <= 1.0 {
        "a minute".to_string()
    } else if minutes < MINUTES_THRESHOLD {
        format!("{} minutes", minutes)
    } else if hours <= 1.0 {
        "an hour".to_string()
    } else if hours < HOURS_THRESHOLD {
        format!("{} hours", hours)
    } else if days <= 1.0 {
        "a day".to_string()
    } else if days < DAYS_THRESHOLD {
        format!("{} days", days)
    } else if months <= 1.0 {
        "a month".to_string()
    } else if months < MONTHS_THRESHOLD {
        format!("{} months", months)
    } else if years <= 1.0 {
        "a year".to_string()
    } else {
        format!("{} years", years)
    }
}

/// Age text for an entry: the humanized age, or the loading placeholder.
pub fn age_text(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match created_at {
        Some(created_at) => humanize(created_at, now),
        None => LOADING_PLACEHOLDER.to_string(),
    }
}

/// Periodic age refresh bound to the lifetime of this value.
#[derive(Debug)]
pub struct AgeTicker {
    handle: Option<JoinHandle<()>>,
}

impl AgeTicker {
    /// Spawn the refresh task. The first refresh happens one `period` from now.
    ///
    /// A zero `period` is raised to [`MIN_REFRESH_PERIOD`].
    pub fn spawn(window: SharedWindow, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let period = period.max(MIN_REFRESH_PERIOD);
        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                let refreshed = window.refresh_ages(clock.now());
                trace!(refreshed, "Age refresh tick");
            }
        });

        debug!(period_ms = period.as_millis() as u64, "Age ticker started");
        Self {
            handle: Some(handle),
        }
    }

    /// Cancel the refresh task. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Age ticker stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for AgeTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
