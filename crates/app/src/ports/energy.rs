//! Live energy measurements, production forecasts, household load and sun data.

use std::future::Future;

use sunhash_domain::energy::{EnergySource, EnergyStateSnapshot};
use sunhash_domain::error::SunHashError;
use sunhash_domain::forecast::Forecast;
use sunhash_domain::home_load::ConsumptionForecast;
use sunhash_domain::id::HomeForecastProviderId;
use sunhash_domain::sun::Sun;
use sunhash_domain::time::Timestamp;

use super::NotConfigured;

/// Reads the current state of an energy source.
pub trait EnergyMonitor: Send + Sync {
    /// Current production, load, battery and grid readings.
    ///
    /// Fails with [`SunHashError::DataUnavailable`] when the source cannot be reached.
    fn get_current_energy_state(
        &self,
        source: &EnergySource,
    ) -> impl Future<Output = Result<EnergyStateSnapshot, SunHashError>> + Send;
}

/// Production forecast for an energy source.
pub trait ForecastProvider: Send + Sync {
    fn get_forecast(
        &self,
        source: &EnergySource,
        at: Timestamp,
    ) -> impl Future<Output = Result<Option<Forecast>, SunHashError>> + Send;
}

/// Forecast of the household's own consumption.
pub trait HomeForecastProvider: Send + Sync {
    fn get_home_consumption_forecast(
        &self,
        provider: HomeForecastProviderId,
        at: Timestamp,
    ) -> impl Future<Output = Result<Option<ConsumptionForecast>, SunHashError>> + Send;
}

/// Astronomical sun data at the installation's location.
pub trait SunProvider: Send + Sync {
    fn get_sun(&self, at: Timestamp)
    -> impl Future<Output = Result<Option<Sun>, SunHashError>> + Send;
}

impl ForecastProvider for NotConfigured {
    async fn get_forecast(
        &self,
        _source: &EnergySource,
        _at: Timestamp,
    ) -> Result<Option<Forecast>, SunHashError> {
        Ok(None)
    }
}

impl HomeForecastProvider for NotConfigured {
    async fn get_home_consumption_forecast(
        &self,
        _provider: HomeForecastProviderId,
        _at: Timestamp,
    ) -> Result<Option<ConsumptionForecast>, SunHashError> {
        Ok(None)
    }
}

impl SunProvider for NotConfigured {
    async fn get_sun(&self, _at: Timestamp) -> Result<Option<Sun>, SunHashError> {
        Ok(None)
    }
}
