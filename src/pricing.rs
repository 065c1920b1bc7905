// Price quotes for validated stays
//
// Amounts are whole currency units. Fractional rates are allowed, but the
// total is rounded half-up exactly once, after multiplying.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calendar::{CalendarDate, MalformedDateError};

// Contract violations by the caller. An invalid window never reaches the
// calculator when it is fed from the validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("stay must cover at least one night, got {0}")]
    NonPositiveNights(i64),

    #[error("long stay must cover at least one month")]
    ZeroMonths,

    #[error("rate must not be negative, got {0}")]
    NegativeRate(Decimal),

    #[error("total for {units} units at {rate} is out of range")]
    Overflow { units: u32, rate: Decimal },

    #[error(transparent)]
    MalformedDate(#[from] MalformedDateError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceQuote {
    Nightly {
        nights: u32,
        rate_per_night: Decimal,
        total: Decimal,
    },
    Monthly {
        months: u32,
        rate_per_month: Decimal,
        total: Decimal,
    },
}

impl PriceQuote {
    pub fn total(&self) -> Decimal {
        match self {
            PriceQuote::Nightly { total, .. } | PriceQuote::Monthly { total, .. } => *total,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PriceCalculator {}

impl PriceCalculator {
    pub fn new() -> Self {
        Self {}
    }

    /// Quote a nightly stay.
    ///
    /// Nights are counted between calendar dates, so timestamps on either
    /// side of a daylight-saving change still count whole days.
    pub fn quote_nightly<A, B>(
        &self,
        check_in: &A,
        check_out: &B,
        rate_per_night: Decimal,
    ) -> Result<PriceQuote, PricingError>
    where
        A: CalendarDate + ?Sized,
        B: CalendarDate + ?Sized,
    {
        let check_in = check_in.calendar_date()?;
        let check_out = check_out.calendar_date()?;
        let days = check_out.signed_duration_since(check_in).num_days();

        let nights = u32::try_from(days)
            .ok()
            .filter(|nights| *nights > 0)
            .ok_or(PricingError::NonPositiveNights(days))?;
        ensure_rate(rate_per_night)?;

        let total = multiply_total(nights, rate_per_night)?;
        debug!(%check_in, %check_out, nights, %total, "nightly quote");

        Ok(PriceQuote::Nightly {
            nights,
            rate_per_night,
            total,
        })
    }

    /// Quote a long stay. Minimum and maximum month bounds are checked by
    /// the caller.
    pub fn quote_monthly(&self, months: u32, rate_per_month: Decimal) -> Result<PriceQuote, PricingError> {
        if months == 0 {
            return Err(PricingError::ZeroMonths);
        }
        ensure_rate(rate_per_month)?;

        let total = multiply_total(months, rate_per_month)?;
        debug!(months, %total, "monthly quote");

        Ok(PriceQuote::Monthly {
            months,
            rate_per_month,
            total,
        })
    }
}

fn ensure_rate(rate: Decimal) -> Result<(), PricingError> {
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(PricingError::NegativeRate(rate));
    }
    Ok(())
}

fn multiply_total(units: u32, rate: Decimal) -> Result<Decimal, PricingError> {
    Decimal::from(units)
        .checked_mul(rate)
        .map(|amount| amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .ok_or(PricingError::Overflow { units, rate })
}
