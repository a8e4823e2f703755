// Time window validation for hourly bookings
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("End time must be after start time")]
    EndBeforeOrEqualStart,

    #[error("Booking must be at least {min_hours} hours")]
    TooShort { min_hours: f64 },

    #[error("Booking cannot exceed {max_hours} hours")]
    TooLong { max_hours: f64 },

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid duration bounds: min {min_hours}h, max {max_hours}h")]
    InvalidConstraint { min_hours: f64, max_hours: f64 },
}

pub const DEFAULT_MIN_HOURS: f64 = 2.0;
pub const DEFAULT_MAX_HOURS: f64 = 12.0;

const TIME_FORMATS: [&str; 3] = ["%H:%M", "%H:%M:%S", "%I:%M %p"];

/// A same-day window a customer picked in the time selection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeWindow {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TimeWindow {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            date,
            start_time,
            end_time,
        }
    }

    /// Build a window from form input, e.g. `("2025-06-11", "10:00", "2:30 PM")`.
    pub fn parse(date: &str, start: &str, end: &str) -> Result<Self, ValidationError> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| ValidationError::InvalidTime(format!("{}: {}", date, e)))?;
        Ok(Self::new(date, parse_time_of_day(start)?, parse_time_of_day(end)?))
    }

    /// Signed length of the window in whole seconds.
    pub fn duration_seconds(&self) -> i64 {
        self.end_time
            .signed_duration_since(self.start_time)
            .num_seconds()
    }

    /// Signed length of the window in fractional hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration_seconds() as f64 / 3600.0
    }
}

pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ValidationError> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .ok_or_else(|| ValidationError::InvalidTime(value.to_string()))
}

#[derive(Debug, Deserialize)]
struct RawConstraint {
    min_hours: f64,
    max_hours: f64,
}

/// Inclusive bounds on how long a booking may last.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawConstraint")]
pub struct DurationConstraint {
    min_hours: f64,
    max_hours: f64,
}

impl DurationConstraint {
    pub fn new(min_hours: f64, max_hours: f64) -> Result<Self, ValidationError> {
        if !(min_hours > 0.0 && min_hours <= max_hours) || !max_hours.is_finite() {
            return Err(ValidationError::InvalidConstraint {
                min_hours,
                max_hours,
            });
        }
        Ok(Self {
            min_hours,
            max_hours,
        })
    }

    pub fn min_hours(&self) -> f64 {
        self.min_hours
    }

    pub fn max_hours(&self) -> f64 {
        self.max_hours
    }
}

impl Default for DurationConstraint {
    fn default() -> Self {
        Self {
            min_hours: DEFAULT_MIN_HOURS,
            max_hours: DEFAULT_MAX_HOURS,
        }
    }
}

impl TryFrom<RawConstraint> for DurationConstraint {
    type Error = ValidationError;

    fn try_from(raw: RawConstraint) -> Result<Self, Self::Error> {
        Self::new(raw.min_hours, raw.max_hours)
    }
}

/// Proof that a window passed validation. Only `validate` produces one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedDuration {
    hours: f64,
    seconds: i64,
}

impl ValidatedDuration {
    pub fn hours(&self) -> f64 {
        self.hours
    }

    /// Exact length, used for money math.
    pub fn seconds(&self) -> i64 {
        self.seconds
    }
}

pub fn validate(
    window: &TimeWindow,
    constraint: &DurationConstraint,
) -> Result<ValidatedDuration, ValidationError> {
    let hours = window.duration_hours();

    if hours <= 0.0 {
        return Err(ValidationError::EndBeforeOrEqualStart);
    }
    if hours < constraint.min_hours {
        return Err(ValidationError::TooShort {
            min_hours: constraint.min_hours,
        });
    }
    if hours > constraint.max_hours {
        return Err(ValidationError::TooLong {
            max_hours: constraint.max_hours,
        });
    }

    Ok(ValidatedDuration {
        hours,
        seconds: window.duration_seconds(),
    })
}

/// Selectable times between `open` and `close` (both inclusive) every
/// `step_minutes`. Never wraps past midnight.
pub fn time_slots(open: NaiveTime, close: NaiveTime, step_minutes: u32) -> Vec<NaiveTime> {
    if step_minutes == 0 || close < open {
        return Vec::new();
    }

    let Some(step) = step_minutes.checked_mul(60) else {
        return vec![open];
    };
    let last = close.num_seconds_from_midnight();
    let mut current = Some(open.num_seconds_from_midnight());
    let mut slots = Vec::new();

    while let Some(seconds) = current.filter(|s| *s <= last) {
        if let Some(slot) = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0) {
            slots.push(slot);
        }
        current = seconds.checked_add(step);
    }

    slots
}
