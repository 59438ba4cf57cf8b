//! Simulated production and household load forecasts.

use chrono::{DurationRound, TimeDelta};

use sunhash_app::ports::{ForecastProvider, HomeForecastProvider};
use sunhash_domain::energy::EnergySource;
use sunhash_domain::error::SunHashError;
use sunhash_domain::forecast::{Forecast, ForecastInterval, ForecastPowerPoint};
use sunhash_domain::home_load::ConsumptionForecast;
use sunhash_domain::id::HomeForecastProviderId;
use sunhash_domain::time::Timestamp;

use crate::energy::SolarProfile;
use crate::sun::SunCalculator;

const HORIZON_HOURS: i64 = 24;
const POINTS_PER_HOUR: i32 = 4;

/// Clear-sky production forecast, one interval per hour.
#[derive(Debug, Clone, Copy)]
pub struct VirtualForecastProvider {
    sun: SunCalculator,
    profile: SolarProfile,
}

impl VirtualForecastProvider {
    #[must_use]
    pub fn new(sun: SunCalculator, profile: SolarProfile) -> Self {
        Self { sun, profile }
    }

    /// Forecast for the 24 hours starting with the hour containing `at`.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] if an interval cannot be built.
    pub fn forecast_at(
        &self,
        source: &EnergySource,
        at: Timestamp,
    ) -> Result<Forecast, SunHashError> {
        let first = hour_start(at);
        let step = quarter_hour();
        let intervals = (0..HORIZON_HOURS)
            .map(|hour| {
                let start = first + TimeDelta::hours(hour);
                let points = (0..POINTS_PER_HOUR)
                    .map(|i| {
                        let t = start + step * i;
                        ForecastPowerPoint::new(t, self.profile.production(&self.sun, source, t))
                    })
                    .collect();
                ForecastInterval::new(start, start + TimeDelta::hours(1), points)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Forecast::new(at, intervals))
    }
}

impl ForecastProvider for VirtualForecastProvider {
    async fn get_forecast(
        &self,
        source: &EnergySource,
        at: Timestamp,
    ) -> Result<Option<Forecast>, SunHashError> {
        self.forecast_at(source, at).map(Some)
    }
}

/// Household load forecast built from the same daily profile as the monitor.
#[derive(Debug, Clone, Copy)]
pub struct VirtualHomeForecast {
    profile: SolarProfile,
    longitude: f64,
    hours_ahead: i32,
}

impl VirtualHomeForecast {
    #[must_use]
    pub fn new(profile: SolarProfile, longitude: f64) -> Self {
        Self {
            profile,
            longitude,
            hours_ahead: 3,
        }
    }

    #[must_use]
    pub fn with_hours_ahead(mut self, hours_ahead: u16) -> Self {
        self.hours_ahead = i32::from(hours_ahead);
        self
    }

    /// Predictions every quarter hour from `at`.
    #[must_use]
    pub fn forecast_at(&self, at: Timestamp) -> ConsumptionForecast {
        let step = quarter_hour();
        (0..self.hours_ahead * POINTS_PER_HOUR)
            .map(|i| at + step * i)
            .fold(ConsumptionForecast::new(at), |forecast, t| {
                forecast.with_prediction(t, self.profile.household_load(self.longitude, t))
            })
    }
}

impl HomeForecastProvider for VirtualHomeForecast {
    async fn get_home_consumption_forecast(
        &self,
        _provider: HomeForecastProviderId,
        at: Timestamp,
    ) -> Result<Option<ConsumptionForecast>, SunHashError> {
        Ok(Some(self.forecast_at(at)))
    }
}

fn quarter_hour() -> TimeDelta {
    TimeDelta::minutes(i64::from(60 / POINTS_PER_HOUR))
}

fn hour_start(at: Timestamp) -> Timestamp {
    at.duration_trunc(TimeDelta::hours(1)).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sun::Location;
    use chrono::{TimeZone, Utc};
    use sunhash_domain::units::Watts;

    fn sun() -> SunCalculator {
        SunCalculator::new(Location::new(59.3293, 18.0686).unwrap())
    }

    fn source() -> EnergySource {
        EnergySource::builder()
            .name("Roof PV")
            .nominal_power_max(Watts(6000.0))
            .build()
            .unwrap()
    }

    #[test]
    fn should_cover_next_day_with_hourly_intervals() {
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 8, 20, 0).unwrap();
        let forecast = VirtualForecastProvider::new(sun(), SolarProfile::default())
            .forecast_at(&source(), at)
            .unwrap();

        assert_eq!(forecast.intervals.len(), 24);
        assert_eq!(
            forecast.intervals[0].start,
            Utc.with_ymd_and_hms(2024, 6, 21, 8, 0, 0).unwrap()
        );
        assert_eq!(forecast.intervals[0].power_points.len(), 4);
    }

    #[test]
    fn should_predict_more_at_noon_than_at_night() {
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 8, 0, 0).unwrap();
        let forecast = VirtualForecastProvider::new(sun(), SolarProfile::default())
            .forecast_at(&source(), at)
            .unwrap();

        let noon = forecast.next_hour_power(Utc.with_ymd_and_hms(2024, 6, 21, 9, 30, 0).unwrap());
        let night = forecast.next_hour_power(Utc.with_ymd_and_hms(2024, 6, 21, 22, 30, 0).unwrap());

        assert!(noon.unwrap().0 > 4000.0);
        assert_eq!(night, Some(Watts::ZERO));
        assert!(forecast.next_hour_energy(at).is_some());
    }

    #[test]
    fn should_predict_evening_peak_in_household_load() {
        let evening = Utc.with_ymd_and_hms(2024, 6, 21, 17, 0, 0).unwrap();
        let forecast = VirtualHomeForecast::new(SolarProfile::default(), 18.0).forecast_at(evening);

        assert_eq!(forecast.predicted.len(), 12);
        assert_eq!(forecast.next_hour_average(evening), Some(Watts(640.0)));
    }

    #[tokio::test]
    async fn should_provide_forecast_through_port() {
        let provider = VirtualForecastProvider::new(sun(), SolarProfile::default());
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();

        let forecast = provider.get_forecast(&source(), at).await.unwrap();

        assert!(forecast.is_some_and(|f| !f.is_empty()));
    }
}
