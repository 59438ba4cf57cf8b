//! Forecast intervals and the power points they carry.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::Timestamp;
use crate::units::{WattHours, Watts};

/// Predicted power at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPowerPoint {
    pub timestamp: Timestamp,
    pub power: Watts,
}

impl ForecastPowerPoint {
    #[must_use]
    pub fn new(timestamp: Timestamp, power: Watts) -> Self {
        Self { timestamp, power }
    }
}

/// A slice of the forecast horizon, e.g. one hour of predicted production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInterval {
    pub start: Timestamp,
    pub end: Timestamp,
    /// Total energy predicted for the whole interval, when the provider reports it.
    pub energy: Option<WattHours>,
    /// Energy still to come within the interval, when the provider reports it.
    pub energy_remaining: Option<WattHours>,
    pub power_points: Vec<ForecastPowerPoint>,
}

impl ForecastInterval {
    /// Create an interval, sorting its points by timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyInterval`] if `end` is not after `start`.
    pub fn new(
        start: Timestamp,
        end: Timestamp,
        mut power_points: Vec<ForecastPowerPoint>,
    ) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::EmptyInterval);
        }
        power_points.sort_by_key(|p| p.timestamp);
        Ok(Self {
            start,
            end,
            energy: None,
            energy_remaining: None,
            power_points,
        })
    }

    #[must_use]
    pub fn with_energy(mut self, energy: WattHours) -> Self {
        self.energy = Some(energy);
        self
    }

    #[must_use]
    pub fn with_energy_remaining(mut self, remaining: WattHours) -> Self {
        self.energy_remaining = Some(remaining);
        self
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Arithmetic mean of the interval's points, `None` when it has none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_power(&self) -> Option<Watts> {
        if self.power_points.is_empty() {
            return None;
        }
        let total: f64 = self.power_points.iter().map(|p| p.power.0).sum();
        Some(Watts(total / self.power_points.len() as f64))
    }

    /// Reported energy, or the average power held over the whole interval.
    #[must_use]
    pub fn estimated_energy(&self) -> Option<WattHours> {
        self.energy
            .or_else(|| self.avg_power().map(|avg| avg.over(self.duration())))
    }

    #[must_use]
    pub fn contains(&self, at: Timestamp) -> bool {
        self.start <= at && at < self.end
    }

    /// Length of the overlap between this interval and `[start, end)`.
    #[must_use]
    pub fn overlap(&self, start: Timestamp, end: Timestamp) -> TimeDelta {
        let from = self.start.max(start);
        let to = self.end.min(end);
        if from < to { to - from } else { TimeDelta::zero() }
    }
}
