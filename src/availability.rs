// Per-unit index of unavailable calendar dates

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::calendar::{canonical_key, date_key, CalendarDate, MalformedDateError};

/// The blocked dates of exactly one bookable unit.
///
/// An index is never updated in place. When the unit's bookings or blocks
/// change, build a new one from the full source set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityIndex {
    unit_id: String,
    blocked: HashSet<String>,
    // same dates as `blocked`, ascending
    ordered: Vec<NaiveDate>,
}

impl AvailabilityIndex {
    /// Build an index from raw unavailable-date rows.
    ///
    /// Rows may arrive in any order and may repeat. The first row that cannot
    /// be read as a calendar date fails the whole build.
    pub fn build<I, D>(unit_id: impl Into<String>, dates: I) -> Result<Self, MalformedDateError>
    where
        I: IntoIterator<Item = D>,
        D: CalendarDate,
    {
        let unit_id = unit_id.into();
        let mut blocked = HashSet::new();
        let mut ordered = Vec::new();
        let mut rows = 0usize;

        for date in dates {
            rows += 1;
            let date = date.calendar_date().inspect_err(|e| {
                warn!(unit_id = %unit_id, error = %e, "unavailable-date row is not a calendar date");
            })?;
            if blocked.insert(date_key(date)) {
                ordered.push(date);
            }
        }
        ordered.sort_unstable();

        debug!(
            unit_id = %unit_id,
            rows,
            distinct = blocked.len(),
            "built availability index"
        );

        Ok(Self {
            unit_id,
            blocked,
            ordered,
        })
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Whether the calendar date of `date` is blocked.
    pub fn is_blocked<D: CalendarDate + ?Sized>(&self, date: &D) -> Result<bool, MalformedDateError> {
        Ok(self.blocked.contains(&canonical_key(date)?))
    }

    /// Whether `date` is blocked. Infallible twin of [`is_blocked`](Self::is_blocked).
    pub fn is_blocked_on(&self, date: NaiveDate) -> bool {
        self.blocked.contains(&date_key(date))
    }

    /// True iff some date `d` with `start < d <= end` is blocked.
    ///
    /// The check-in day itself is never inspected. Returns false when
    /// `end <= start`; ordering the window is the caller's job.
    pub fn has_blocked_between(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let mut day = start;
        while day < end {
            match day.succ_opt() {
                Some(next) => day = next,
                None => return false,
            }
            if self.is_blocked_on(day) {
                return true;
            }
        }
        false
    }

    /// Earliest blocked date strictly after `date`, if any.
    ///
    /// Every check-out candidate on or after this date would cover a blocked
    /// night, so a calendar can grey out everything from here onwards.
    pub fn first_blocked_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        let next = self.ordered.partition_point(|blocked| *blocked <= date);
        self.ordered.get(next).copied()
    }

    /// All blocked dates in ascending order.
    pub fn blocked_dates(&self) -> &[NaiveDate] {
        &self.ordered
    }
}
