//! Physical units carried by measurements and forecasts.

use std::fmt;
use std::ops::{Add, Sub};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::hours;

/// Instantaneous power, in watts. Sign depends on the measurement it belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watts(pub f64);

/// Energy, in watt-hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WattHours(pub f64);

/// A ratio expressed on a 0–100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(pub f64);

impl Watts {
    pub const ZERO: Self = Self(0.0);

    /// Energy delivered by this power held constant during `duration`.
    #[must_use]
    pub fn over(self, duration: TimeDelta) -> WattHours {
        WattHours(self.0 * hours(duration))
    }

    /// Positive part of the value, zero otherwise.
    #[must_use]
    pub fn positive_part(self) -> Self {
        Self(self.0.max(0.0))
    }

    /// Magnitude of the negative part of the value, zero otherwise.
    #[must_use]
    pub fn negative_part(self) -> Self {
        Self((-self.0).max(0.0))
    }
}

impl Add for Watts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Watts {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Add for WattHours {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Watts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} W", self.0)
    }
}

impl fmt::Display for WattHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} Wh", self.0)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

/// Reject values that are not strictly positive finite numbers.
pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { field });
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositive { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_integrate_power_over_duration() {
        let energy = Watts(1200.0).over(TimeDelta::minutes(30));
        assert!((energy.0 - 600.0).abs() < 1e-9);
    }

    #[test]
    fn should_split_signed_power_into_parts() {
        assert_eq!(Watts(50.0).positive_part(), Watts(50.0));
        assert_eq!(Watts(50.0).negative_part(), Watts::ZERO);
        assert_eq!(Watts(-30.0).positive_part(), Watts::ZERO);
        assert_eq!(Watts(-30.0).negative_part(), Watts(30.0));
    }

    #[test]
    fn should_reject_zero_and_nan_when_ensuring_positive() {
        assert!(ensure_positive("capacity", 10.0).is_ok());
        assert_eq!(
            ensure_positive("capacity", 0.0),
            Err(ValidationError::NonPositive {
                field: "capacity",
                value: 0.0
            })
        );
        assert_eq!(
            ensure_positive("capacity", f64::NAN),
            Err(ValidationError::NonFinite { field: "capacity" })
        );
    }

    #[test]
    fn should_serialize_as_bare_number() {
        let json = serde_json::to_string(&Watts(2500.0)).unwrap();
        assert_eq!(json, "2500.0");
    }

    #[test]
    fn should_display_with_unit_suffix() {
        assert_eq!(Watts(1500.0).to_string(), "1500.0 W");
        assert_eq!(Percentage(42.0).to_string(), "42.0%");
    }
}
