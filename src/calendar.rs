// Calendar-date normalization shared by every availability lookup
//
// All membership checks go through `date_key`, so a date stored by the index
// and a date queried against it can never be normalized two different ways.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEY_FORMAT: &str = "%Y-%m-%d";
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// Raised when a value from the data source cannot be read as a calendar date
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed date {input:?}: {reason}")]
pub struct MalformedDateError {
    pub input: String,
    pub reason: String,
}

impl MalformedDateError {
    pub fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Anything that can be reduced to a calendar date (year, month, day).
///
/// Timestamps reduce to the calendar date in their own zone, not to the UTC
/// instant, so `2025-06-10T23:30:00-05:00` is the 10th.
pub trait CalendarDate {
    fn calendar_date(&self) -> Result<NaiveDate, MalformedDateError>;
}

impl CalendarDate for NaiveDate {
    fn calendar_date(&self) -> Result<NaiveDate, MalformedDateError> {
        Ok(*self)
    }
}

impl CalendarDate for NaiveDateTime {
    fn calendar_date(&self) -> Result<NaiveDate, MalformedDateError> {
        Ok(self.date())
    }
}

impl<Tz: TimeZone> CalendarDate for DateTime<Tz> {
    fn calendar_date(&self) -> Result<NaiveDate, MalformedDateError> {
        Ok(self.date_naive())
    }
}

impl CalendarDate for str {
    fn calendar_date(&self) -> Result<NaiveDate, MalformedDateError> {
        let raw = self.trim();
        if raw.is_empty() {
            return Err(MalformedDateError::new(self, "empty value"));
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, KEY_FORMAT) {
            return Ok(date);
        }
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
            return Ok(timestamp.date_naive());
        }

        NaiveDateTime::parse_from_str(raw, NAIVE_TIMESTAMP_FORMAT)
            .map(|timestamp| timestamp.date())
            .map_err(|e| MalformedDateError::new(self, e.to_string()))
    }
}

impl CalendarDate for String {
    fn calendar_date(&self) -> Result<NaiveDate, MalformedDateError> {
        self.as_str().calendar_date()
    }
}

impl<T: CalendarDate + ?Sized> CalendarDate for &T {
    fn calendar_date(&self) -> Result<NaiveDate, MalformedDateError> {
        (**self).calendar_date()
    }
}

// One blocked-date row as delivered by the unavailable-date source.
// Unreadable strings are kept as `Raw` and rejected when the index is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnavailableDate {
    Date(NaiveDate),
    Timestamp(DateTime<FixedOffset>),
    Raw(String),
}

impl CalendarDate for UnavailableDate {
    fn calendar_date(&self) -> Result<NaiveDate, MalformedDateError> {
        match self {
            UnavailableDate::Date(date) => Ok(*date),
            UnavailableDate::Timestamp(timestamp) => timestamp.calendar_date(),
            UnavailableDate::Raw(raw) => raw.calendar_date(),
        }
    }
}

impl From<NaiveDate> for UnavailableDate {
    fn from(date: NaiveDate) -> Self {
        UnavailableDate::Date(date)
    }
}

impl From<&str> for UnavailableDate {
    fn from(raw: &str) -> Self {
        UnavailableDate::Raw(raw.to_string())
    }
}

impl From<String> for UnavailableDate {
    fn from(raw: String) -> Self {
        UnavailableDate::Raw(raw)
    }
}

/// Canonical `YYYY-MM-DD` key for a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format(KEY_FORMAT).to_string()
}

pub fn canonical_key<D: CalendarDate + ?Sized>(date: &D) -> Result<String, MalformedDateError> {
    date.calendar_date().map(date_key)
}
