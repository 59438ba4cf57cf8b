//! Household load forecast.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;
use crate::units::Watts;

/// Predicted household consumption, excluding the miners, keyed by instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionForecast {
    pub generated_at: Timestamp,
    pub predicted: BTreeMap<Timestamp, Watts>,
}

impl ConsumptionForecast {
    #[must_use]
    pub fn new(generated_at: Timestamp) -> Self {
        Self {
            generated_at,
            predicted: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_prediction(mut self, at: Timestamp, power: Watts) -> Self {
        self.predicted.insert(at, power);
        self
    }

    /// Mean of the predictions falling in `[start, end)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_between(&self, start: Timestamp, end: Timestamp) -> Option<Watts> {
        let values: Vec<f64> = self.predicted.range(start..end).map(|(_, w)| w.0).collect();
        if values.is_empty() {
            return None;
        }
        Some(Watts(values.iter().sum::<f64>() / values.len() as f64))
    }

    #[must_use]
    pub fn peak_between(&self, start: Timestamp, end: Timestamp) -> Option<Watts> {
        self.predicted
            .range(start..end)
            .map(|(_, w)| *w)
            .reduce(|a, b| if b.0 > a.0 { b } else { a })
    }

    #[must_use]
    pub fn next_hour_average(&self, at: Timestamp) -> Option<Watts> {
        self.average_between(at, at + TimeDelta::hours(1))
    }
}
