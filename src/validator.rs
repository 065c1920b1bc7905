// Booking-window validation, the disabled-date policy for calendar pickers,
// and the per-attempt selection state

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::availability::AvailabilityIndex;
use crate::calendar::{CalendarDate, MalformedDateError};

// Why a proposed window cannot be booked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidReason {
    NoCheckIn,
    NoCheckOut,
    CheckOutNotAfterCheckIn,
    CheckOutBlocked,
    InteriorNightBlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid { nights: u32 },
    Invalid { reason: InvalidReason },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid { .. })
    }

    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            ValidationResult::Valid { .. } => None,
            ValidationResult::Invalid { reason } => Some(*reason),
        }
    }

    fn invalid(reason: InvalidReason) -> Self {
        ValidationResult::Invalid { reason }
    }
}

/// An ordered check-in/check-out pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl BookingWindow {
    /// Returns `None` unless `check_out` is strictly after `check_in`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Option<Self> {
        (check_out > check_in).then_some(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> u32 {
        let days = self.check_out.signed_duration_since(self.check_in).num_days();
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    /// The occupied date cells: every date after check-in up to and
    /// including check-out.
    pub fn interior_nights(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.check_in
            .iter_days()
            .skip(1)
            .take_while(move |day| *day <= self.check_out)
    }
}

// Bounds for the disabled-date listings handed to a calendar UI
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub horizon_days: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self { horizon_days: 365 }
    }
}

pub struct BookingWindowValidator<'a> {
    index: &'a AvailabilityIndex,
    config: CalendarConfig,
}

impl<'a> BookingWindowValidator<'a> {
    pub fn new(index: &'a AvailabilityIndex) -> Self {
        Self::with_config(index, CalendarConfig::default())
    }

    pub fn with_config(index: &'a AvailabilityIndex, config: CalendarConfig) -> Self {
        Self { index, config }
    }

    pub fn index(&self) -> &AvailabilityIndex {
        self.index
    }

    /// Decide whether a selection can be booked. The first failing rule wins.
    pub fn validate(&self, check_in: Option<NaiveDate>, check_out: Option<NaiveDate>) -> ValidationResult {
        let Some(check_in) = check_in else {
            return ValidationResult::invalid(InvalidReason::NoCheckIn);
        };
        let Some(check_out) = check_out else {
            return ValidationResult::invalid(InvalidReason::NoCheckOut);
        };
        let Some(window) = BookingWindow::new(check_in, check_out) else {
            return ValidationResult::invalid(InvalidReason::CheckOutNotAfterCheckIn);
        };

        if self.index.is_blocked_on(check_out) {
            return ValidationResult::invalid(InvalidReason::CheckOutBlocked);
        }
        if window.interior_nights().any(|night| self.index.is_blocked_on(night)) {
            return ValidationResult::invalid(InvalidReason::InteriorNightBlocked);
        }

        ValidationResult::Valid {
            nights: window.nights(),
        }
    }

    /// Same as [`validate`](Self::validate) for dates that still need to be
    /// read from caller or source data. Unreadable dates are an error, not an
    /// invalid selection.
    pub fn validate_input<A, B>(
        &self,
        check_in: Option<&A>,
        check_out: Option<&B>,
    ) -> Result<ValidationResult, MalformedDateError>
    where
        A: CalendarDate + ?Sized,
        B: CalendarDate + ?Sized,
    {
        let check_in = check_in.map(|date| date.calendar_date()).transpose()?;
        let check_out = check_out.map(|date| date.calendar_date()).transpose()?;
        Ok(self.validate(check_in, check_out))
    }

    pub fn is_check_in_disabled(&self, candidate: NaiveDate, today: NaiveDate) -> bool {
        candidate < today || self.index.is_blocked_on(candidate)
    }

    /// Without a chosen check-in, only past and blocked dates are disabled.
    pub fn is_check_out_disabled(
        &self,
        check_in: Option<NaiveDate>,
        candidate: NaiveDate,
        today: NaiveDate,
    ) -> bool {
        if candidate < today {
            return true;
        }
        match check_in {
            Some(check_in) => candidate <= check_in || self.index.has_blocked_between(check_in, candidate),
            None => self.index.is_blocked_on(candidate),
        }
    }

    /// Disabled check-in dates from `today` through the configured horizon.
    pub fn disabled_check_in_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        self.horizon(today)
            .filter(|day| self.is_check_in_disabled(*day, today))
            .collect()
    }

    /// Disabled check-out dates from `today` through the configured horizon.
    pub fn disabled_check_out_dates(&self, check_in: Option<NaiveDate>, today: NaiveDate) -> Vec<NaiveDate> {
        // past the first blocked date after check-in, every candidate is disabled
        let cutoff = check_in.and_then(|check_in| self.index.first_blocked_after(check_in));

        self.horizon(today)
            .filter(|day| match cutoff {
                Some(cutoff) if *day >= cutoff => true,
                _ => self.is_check_out_disabled(check_in, *day, today),
            })
            .collect()
    }

    fn horizon(&self, today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        let last = today
            .checked_add_days(Days::new(u64::from(self.config.horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        today.iter_days().take_while(move |day| *day <= last)
    }
}

// Where a booking attempt currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Empty,
    CheckInChosen,
    WindowComplete,
    Valid { nights: u32 },
    Invalid { reason: InvalidReason },
}

/// The dates picked so far in one booking attempt.
///
/// Holds no reference to an index; the caller passes the current validator
/// on every pick, so a rebuilt index takes effect on the next pick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingSelection {
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    outcome: Option<ValidationResult>,
}

impl BookingSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_in(&self) -> Option<NaiveDate> {
        self.check_in
    }

    pub fn check_out(&self) -> Option<NaiveDate> {
        self.check_out
    }

    pub fn state(&self) -> SelectionState {
        match (self.check_in, self.check_out, self.outcome) {
            (_, _, Some(ValidationResult::Valid { nights })) => SelectionState::Valid { nights },
            (_, _, Some(ValidationResult::Invalid { reason })) => SelectionState::Invalid { reason },
            (Some(_), None, None) => SelectionState::CheckInChosen,
            (Some(_), Some(_), None) => SelectionState::WindowComplete,
            _ => SelectionState::Empty,
        }
    }

    /// Pick a check-in date.
    ///
    /// An existing check-out that no longer forms a valid window with the new
    /// check-in is dropped without surfacing an error. Returns whether that
    /// happened.
    pub fn choose_check_in(&mut self, validator: &BookingWindowValidator<'_>, date: NaiveDate) -> bool {
        self.check_in = Some(date);
        self.outcome = None;

        let Some(check_out) = self.check_out else {
            return false;
        };
        let recheck = validator.validate(Some(date), Some(check_out));
        if recheck.is_valid() {
            return false;
        }

        debug!(
            unit_id = validator.index().unit_id(),
            check_in = %date,
            check_out = %check_out,
            reason = ?recheck.reason(),
            "cleared stale check-out after check-in change"
        );
        self.check_out = None;
        true
    }

    /// Pick a check-out date and evaluate the completed window.
    pub fn choose_check_out(&mut self, validator: &BookingWindowValidator<'_>, date: NaiveDate) -> ValidationResult {
        self.check_out = Some(date);
        self.evaluate(validator)
    }

    /// Evaluate the current pair, recording the outcome.
    pub fn evaluate(&mut self, validator: &BookingWindowValidator<'_>) -> ValidationResult {
        let result = validator.validate(self.check_in, self.check_out);
        self.outcome = Some(result);
        result
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn june(day: u32) -> NaiveDate {
        ymd(2025, 6, day)
    }

    fn june_index() -> AvailabilityIndex {
        AvailabilityIndex::build("villa-7", ["2025-06-10", "2025-06-15"]).unwrap()
    }

    #[test_case(june(1), june(10), ValidationResult::Invalid { reason: InvalidReason::CheckOutBlocked }; "#1 check-out on a blocked date")]
    #[test_case(june(1), june(9), ValidationResult::Valid { nights: 8 }; "#2 stay ending before the block")]
    #[test_case(june(11), june(16), ValidationResult::Invalid { reason: InvalidReason::InteriorNightBlocked }; "#3 blocked night inside the stay")]
    #[test_case(june(11), june(14), ValidationResult::Valid { nights: 3 }; "#4 stay between blocks")]
    #[test_case(june(10), june(14), ValidationResult::Valid { nights: 4 }; "#5 check-in on a blocked date is not inspected")]
    #[test_case(june(9), june(9), ValidationResult::Invalid { reason: InvalidReason::CheckOutNotAfterCheckIn }; "#6 same day")]
    #[test_case(june(9), june(2), ValidationResult::Invalid { reason: InvalidReason::CheckOutNotAfterCheckIn }; "#7 reversed")]
    #[test_case(june(15), june(10), ValidationResult::Invalid { reason: InvalidReason::CheckOutNotAfterCheckIn }; "#8 ordering wins over blocks")]
    #[test_case(june(1), june(20), ValidationResult::Invalid { reason: InvalidReason::InteriorNightBlocked }; "#9 spans both blocks")]
    fn test_validate_june_calendar(check_in: NaiveDate, check_out: NaiveDate, expected: ValidationResult) {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);
        assert_eq!(validator.validate(Some(check_in), Some(check_out)), expected);
    }

    #[test]
    fn test_missing_dates() {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);

        assert_eq!(validator.validate(None, None).reason(), Some(InvalidReason::NoCheckIn));
        assert_eq!(validator.validate(None, Some(june(3))).reason(), Some(InvalidReason::NoCheckIn));
        assert_eq!(validator.validate(Some(june(3)), None).reason(), Some(InvalidReason::NoCheckOut));
    }

    #[test]
    fn test_check_out_blocked_reported_before_interior() {
        // both the 10th (interior) and the 15th (check-out) are blocked
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);
        assert_eq!(
            validator.validate(Some(june(1)), Some(june(15))).reason(),
            Some(InvalidReason::CheckOutBlocked)
        );
    }

    #[test]
    fn test_validate_input_propagates_malformed_dates() {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);

        let result = validator.validate_input(Some("2025-06-11"), Some("2025-06-14T09:00:00+02:00"));
        assert_eq!(result, Ok(ValidationResult::Valid { nights: 3 }));

        let err = validator.validate_input(Some("2025-06-11"), Some("2025-06-00")).unwrap_err();
        assert_eq!(err.input, "2025-06-00");

        let missing = validator.validate_input(Some("2025-06-11"), None::<&str>);
        assert_eq!(missing, Ok(ValidationResult::Invalid { reason: InvalidReason::NoCheckOut }));
    }

    #[test]
    fn test_interior_nights_include_check_out_but_not_check_in() {
        let window = BookingWindow::new(june(11), june(14)).unwrap();
        let nights: Vec<NaiveDate> = window.interior_nights().collect();

        assert_eq!(nights, vec![june(12), june(13), june(14)]);
        assert_eq!(window.nights(), 3);
        assert!(BookingWindow::new(june(14), june(14)).is_none());
    }

    #[test]
    fn test_nights_across_month_and_year_boundaries() {
        let window = BookingWindow::new(ymd(2025, 12, 30), ymd(2026, 1, 2)).unwrap();
        assert_eq!(window.nights(), 3);

        let leap = BookingWindow::new(ymd(2028, 2, 28), ymd(2028, 3, 1)).unwrap();
        assert_eq!(leap.nights(), 2);
    }

    #[test]
    fn test_check_in_disabled_policy() {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);
        let today = june(5);

        assert!(validator.is_check_in_disabled(june(4), today));
        assert!(!validator.is_check_in_disabled(june(5), today));
        assert!(validator.is_check_in_disabled(june(10), today));
        assert!(!validator.is_check_in_disabled(june(11), today));
    }

    #[test]
    fn test_check_out_disabled_policy() {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);
        let today = june(5);

        // past
        assert!(validator.is_check_out_disabled(Some(june(1)), june(4), today));
        // not after check-in
        assert!(validator.is_check_out_disabled(Some(june(6)), june(6), today));
        assert!(!validator.is_check_out_disabled(Some(june(6)), june(9), today));
        // blocked check-out or blocked night inside
        assert!(validator.is_check_out_disabled(Some(june(6)), june(10), today));
        assert!(validator.is_check_out_disabled(Some(june(6)), june(12), today));
        assert!(!validator.is_check_out_disabled(Some(june(10)), june(12), today));
        // no check-in yet
        assert!(!validator.is_check_out_disabled(None, june(9), today));
        assert!(validator.is_check_out_disabled(None, june(10), today));
    }

    #[test]
    fn test_disabled_policy_agrees_with_validator() {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);
        let today = june(1);

        for check_in in 1..=20 {
            for check_out in 1..=25 {
                let disabled = validator.is_check_out_disabled(Some(june(check_in)), june(check_out), today);
                let valid = validator.validate(Some(june(check_in)), Some(june(check_out))).is_valid();
                assert_eq!(disabled, !valid, "check-in {} check-out {}", check_in, check_out);
            }
        }
    }

    #[test]
    fn test_disabled_listings_within_horizon() {
        let index = june_index();
        let config = CalendarConfig { horizon_days: 19 };
        let validator = BookingWindowValidator::with_config(&index, config);
        let today = june(1);

        assert_eq!(validator.disabled_check_in_dates(today), vec![june(10), june(15)]);

        let after_check_in = validator.disabled_check_out_dates(Some(june(11)), today);
        let mut expected: Vec<NaiveDate> = (1..=11).map(june).collect();
        expected.extend((15..=20).map(june));
        assert_eq!(after_check_in, expected);

        assert_eq!(validator.disabled_check_out_dates(None, today), vec![june(10), june(15)]);
    }

    #[test]
    fn test_calendar_config_deserializes_with_defaults() {
        let config: CalendarConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CalendarConfig::default());

        let config: CalendarConfig = serde_json::from_str(r#"{"horizon_days": 90}"#).unwrap();
        assert_eq!(config.horizon_days, 90);
    }

    #[test]
    fn test_selection_walks_through_states() {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);
        let mut selection = BookingSelection::new();
        assert_eq!(selection.state(), SelectionState::Empty);

        assert!(!selection.choose_check_in(&validator, june(1)));
        assert_eq!(selection.state(), SelectionState::CheckInChosen);

        let result = selection.choose_check_out(&validator, june(10));
        assert_eq!(result.reason(), Some(InvalidReason::CheckOutBlocked));
        assert_eq!(
            selection.state(),
            SelectionState::Invalid {
                reason: InvalidReason::CheckOutBlocked
            }
        );

        selection.choose_check_out(&validator, june(9));
        assert_eq!(selection.state(), SelectionState::Valid { nights: 8 });

        selection.clear();
        assert_eq!(selection.state(), SelectionState::Empty);
    }

    #[test]
    fn test_new_check_in_clears_incompatible_check_out() {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);
        let mut selection = BookingSelection::new();

        selection.choose_check_in(&validator, june(11));
        assert!(selection.choose_check_out(&validator, june(14)).is_valid());

        // moving check-in back puts the 10th inside the stay
        let cleared = selection.choose_check_in(&validator, june(8));
        assert!(cleared);
        assert_eq!(selection.check_in(), Some(june(8)));
        assert_eq!(selection.check_out(), None);
        assert_eq!(selection.state(), SelectionState::CheckInChosen);

        // the stale pair is never evaluated
        assert_eq!(selection.evaluate(&validator).reason(), Some(InvalidReason::NoCheckOut));
    }

    #[test]
    fn test_new_check_in_after_check_out_clears_it() {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);
        let mut selection = BookingSelection::new();

        selection.choose_check_in(&validator, june(1));
        selection.choose_check_out(&validator, june(5));

        assert!(selection.choose_check_in(&validator, june(6)));
        assert_eq!(selection.check_out(), None);
    }

    #[test]
    fn test_new_check_in_keeps_compatible_check_out() {
        let index = june_index();
        let validator = BookingWindowValidator::new(&index);
        let mut selection = BookingSelection::new();

        selection.choose_check_in(&validator, june(11));
        selection.choose_check_out(&validator, june(14));

        assert!(!selection.choose_check_in(&validator, june(12)));
        assert_eq!(selection.check_out(), Some(june(14)));
        assert_eq!(selection.state(), SelectionState::WindowComplete);
        assert_eq!(selection.evaluate(&validator), ValidationResult::Valid { nights: 2 });
    }

    #[test]
    fn test_validation_result_serializes_with_status_tag() {
        let json = serde_json::to_value(ValidationResult::Invalid {
            reason: InvalidReason::InteriorNightBlocked,
        })
        .unwrap();
        assert_eq!(json["status"], "invalid");
        assert_eq!(json["reason"], "InteriorNightBlocked");

        let json = serde_json::to_value(ValidationResult::Valid { nights: 3 }).unwrap();
        assert_eq!(json["status"], "valid");
        assert_eq!(json["nights"], 3);
    }
}
