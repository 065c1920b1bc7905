// Availability-aware booking windows for rentable units (properties, vehicles)

pub mod availability;
pub mod calendar;
pub mod pricing;
pub mod source;
pub mod validator;

// Re-export key types for convenience
pub use availability::AvailabilityIndex;
pub use calendar::{canonical_key, date_key, CalendarDate, MalformedDateError, UnavailableDate};
pub use pricing::{PriceCalculator, PriceQuote, PricingError};
pub use source::{
    load_index, InMemoryCatalog, LoadError, RateSource, SourceError, UnavailableDateSource, UnitRate,
};
pub use validator::{
    BookingSelection, BookingWindow, BookingWindowValidator, CalendarConfig, InvalidReason,
    SelectionState, ValidationResult,
};
