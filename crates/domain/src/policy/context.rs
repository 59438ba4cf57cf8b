//! Everything a rule may look at for one miner.

use chrono::{FixedOffset, Offset, Utc};

use crate::energy::{EnergySource, EnergyStateSnapshot};
use crate::forecast::Forecast;
use crate::home_load::ConsumptionForecast;
use crate::miner::{HashRate, Miner};
use crate::sun::Sun;
use crate::time::Timestamp;

/// A timestamped, read-only view assembled once per miner per cycle.
///
/// The miner and the energy snapshot are always present. Every other input
/// is optional: rules that need a missing input simply do not match.
#[derive(Debug, Clone, Copy)]
pub struct DecisionalContext<'a> {
    pub energy_source: &'a EnergySource,
    pub energy_state: &'a EnergyStateSnapshot,
    pub miner: &'a Miner,
    pub forecast: Option<&'a Forecast>,
    pub home_load_forecast: Option<&'a ConsumptionForecast>,
    pub tracker_hash_rate: Option<HashRate>,
    pub sun: Option<&'a Sun>,
    pub timestamp: Timestamp,
    /// Offset used to turn `timestamp` into a local time of day.
    pub utc_offset: FixedOffset,
}

impl<'a> DecisionalContext<'a> {
    #[must_use]
    pub fn new(
        energy_source: &'a EnergySource,
        energy_state: &'a EnergyStateSnapshot,
        miner: &'a Miner,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            energy_source,
            energy_state,
            miner,
            forecast: None,
            home_load_forecast: None,
            tracker_hash_rate: None,
            sun: None,
            timestamp,
            utc_offset: Utc.fix(),
        }
    }

    #[must_use]
    pub fn with_forecast(mut self, forecast: Option<&'a Forecast>) -> Self {
        self.forecast = forecast;
        self
    }

    #[must_use]
    pub fn with_home_load_forecast(mut self, forecast: Option<&'a ConsumptionForecast>) -> Self {
        self.home_load_forecast = forecast;
        self
    }

    #[must_use]
    pub fn with_tracker_hash_rate(mut self, hash_rate: Option<HashRate>) -> Self {
        self.tracker_hash_rate = hash_rate;
        self
    }

    #[must_use]
    pub fn with_sun(mut self, sun: Option<&'a Sun>) -> Self {
        self.sun = sun;
        self
    }

    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}
