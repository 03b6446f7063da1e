//! Clock abstraction and calendar-day helpers.
//!
//! Every date-dependent rule (today's completion slot, the "yesterday"
//! streak check, last-N-days windows) goes through a [`Clock`] so tests can
//! pin the calendar.

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use std::sync::{Arc, PoisonError, RwLock};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Source of the current instant and the current local calendar day.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn today(&self) -> NaiveDate;
}

/// Wall clock with an optional pinned day.
///
/// Clones share the pin, so a test can keep a handle and move "today" while
/// the engine owns another clone.
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    pinned: Arc<RwLock<Option<NaiveDate>>>,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock frozen on `day` until unpinned.
    #[must_use]
    pub fn pinned(day: NaiveDate) -> Self {
        let clock = Self::new();
        clock.pin_today(Some(day));
        clock
    }

    /// Pin (or with `None`, release) the day returned by [`Clock::today`].
    pub fn pin_today(&self, day: Option<NaiveDate>) {
        *self.pinned.write().unwrap_or_else(PoisonError::into_inner) = day;
    }

    #[must_use]
    pub fn pinned_day(&self) -> Option<NaiveDate> {
        *self.pinned.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the pinned day forward, pinning the real local day first if unset.
    pub fn advance_days(&self, days: u64) {
        let mut guard = self.pinned.write().unwrap_or_else(PoisonError::into_inner);
        let base = guard.unwrap_or_else(|| Local::now().date_naive());
        *guard = Some(base.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX));
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        // A pinned calendar also pins the instant (midday) so timestamps stay reproducible.
        match self.pinned_day().and_then(|day| day.and_hms_opt(12, 0, 0)) {
            Some(noon) => noon.and_utc(),
            None => Utc::now(),
        }
    }

    fn today(&self) -> NaiveDate {
        self.pinned_day()
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Format a calendar day as zero-padded `YYYY-MM-DD`.
#[must_use]
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` calendar day.
#[must_use]
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT).ok()
}

/// Whether `earlier` is exactly one calendar day before `later`.
#[must_use]
pub fn is_previous_day(earlier: NaiveDate, later: NaiveDate) -> bool {
    later.signed_duration_since(earlier).num_days() == 1
}

/// The calendar day `n` days before the clock's today.
#[must_use]
pub fn days_ago<C: Clock + ?Sized>(clock: &C, n: u32) -> NaiveDate {
    clock
        .today()
        .checked_sub_days(Days::new(u64::from(n)))
        .unwrap_or(NaiveDate::MIN)
}

/// The last `n` calendar days, oldest first, ending with today.
#[must_use]
pub fn last_n_days<C: Clock + ?Sized>(clock: &C, n: u32) -> Vec<NaiveDate> {
    (0..n).rev().map(|offset| days_ago(clock, offset)).collect()
}
