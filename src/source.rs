// Collaborators that supply blocked dates and rates for a unit
//
// Fetching is asynchronous and lives entirely on this side of the crate. The
// index, validator and calculator stay synchronous.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::availability::AvailabilityIndex;
use crate::calendar::{MalformedDateError, UnavailableDate};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Data integrity error: {0}")]
    MalformedDate(#[from] MalformedDateError),
}

// How a unit is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRate {
    Nightly(Decimal),
    Monthly(Decimal),
}

#[async_trait]
pub trait UnavailableDateSource: Send + Sync {
    // Current blocked dates for the unit, in any order, duplicates allowed
    async fn unavailable_dates(&self, unit_id: &str) -> Result<Vec<UnavailableDate>, SourceError>;
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn rate(&self, unit_id: &str) -> Result<UnitRate, SourceError>;
}

/// Fetch a unit's calendar and build a fresh index from it.
///
/// Call again after any booking or block changes; indexes are not patched.
pub async fn load_index<S>(source: &S, unit_id: &str) -> Result<AvailabilityIndex, LoadError>
where
    S: UnavailableDateSource + ?Sized,
{
    let rows = source.unavailable_dates(unit_id).await.inspect_err(|e| {
        warn!(unit_id, error = %e, "failed to fetch unavailable dates");
    })?;
    debug!(unit_id, rows = rows.len(), "fetched unavailable dates");

    Ok(AvailabilityIndex::build(unit_id, rows)?)
}

// Preloaded calendars and rates keyed by unit id
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    dates: DashMap<String, Vec<UnavailableDate>>,
    rates: DashMap<String, UnitRate>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable_dates(&self, unit_id: &str, dates: Vec<UnavailableDate>) {
        self.dates.insert(unit_id.to_string(), dates);
    }

    pub fn add_unavailable_date(&self, unit_id: &str, date: UnavailableDate) {
        self.dates.entry(unit_id.to_string()).or_default().push(date);
    }

    pub fn set_rate(&self, unit_id: &str, rate: UnitRate) {
        self.rates.insert(unit_id.to_string(), rate);
    }

    pub fn remove_unit(&self, unit_id: &str) -> bool {
        let had_dates = self.dates.remove(unit_id).is_some();
        let had_rate = self.rates.remove(unit_id).is_some();
        had_dates || had_rate
    }
}

#[async_trait]
impl UnavailableDateSource for InMemoryCatalog {
    async fn unavailable_dates(&self, unit_id: &str) -> Result<Vec<UnavailableDate>, SourceError> {
        self.dates
            .get(unit_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SourceError::UnknownUnit(unit_id.to_string()))
    }
}

#[async_trait]
impl RateSource for InMemoryCatalog {
    async fn rate(&self, unit_id: &str) -> Result<UnitRate, SourceError> {
        self.rates
            .get(unit_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| SourceError::UnknownUnit(unit_id.to_string()))
    }
}
