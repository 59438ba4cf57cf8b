//! Sun position and daily events from a declination and hour-angle model.
//!
//! Accurate to a few minutes, which is plenty for daylight rules. Event
//! times are computed for the UTC day containing the requested instant.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveTime, TimeDelta, Timelike};

use sunhash_app::ports::SunProvider;
use sunhash_domain::error::SunHashError;
use sunhash_domain::sun::Sun;
use sunhash_domain::time::Timestamp;

use crate::error::VirtualError;

/// Elevation of the sun's centre at sunrise, accounting for refraction and disc size.
const SUNRISE_ELEVATION: f64 = -0.833;
const CIVIL_TWILIGHT_ELEVATION: f64 = -6.0;

/// Geographic position of the installation, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// # Errors
    ///
    /// Returns [`VirtualError::InvalidLatitude`] or [`VirtualError::InvalidLongitude`]
    /// when a coordinate is out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, VirtualError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(VirtualError::InvalidLatitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(VirtualError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Where the sun stands in the sky, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    /// Above the horizon when positive.
    pub elevation: f64,
    /// Clockwise from north.
    pub azimuth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunCalculator {
    location: Location,
}

impl SunCalculator {
    #[must_use]
    pub fn new(location: Location) -> Self {
        Self { location }
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Sun position at `at`.
    #[must_use]
    pub fn position(&self, at: Timestamp) -> SolarPosition {
        let day = f64::from(at.ordinal());
        let declination = declination(day);
        let latitude = self.location.latitude.to_radians();

        let hour = f64::from(at.hour())
            + f64::from(at.minute()) / 60.0
            + f64::from(at.second()) / 3600.0;
        let solar_time = hour + self.location.longitude / 15.0 + equation_of_time(day) / 60.0;
        let hour_angle = (15.0 * (solar_time - 12.0)).to_radians();

        let elevation = (latitude.sin() * declination.sin()
            + latitude.cos() * declination.cos() * hour_angle.cos())
        .asin();

        let azimuth_cos = (declination.sin() - latitude.sin() * elevation.sin())
            / (latitude.cos() * elevation.cos());
        let mut azimuth = azimuth_cos.clamp(-1.0, 1.0).acos().to_degrees();
        if hour_angle.sin() > 0.0 {
            azimuth = 360.0 - azimuth;
        }

        SolarPosition {
            elevation: elevation.to_degrees(),
            azimuth,
        }
    }

    /// Sun events of the UTC day containing `at`, with the position at `at`.
    ///
    /// Returns `None` when the sun does not rise or set that day, or when
    /// civil twilight never ends (polar day, polar night, white nights).
    #[must_use]
    pub fn sun_at(&self, at: Timestamp) -> Option<Sun> {
        let day = f64::from(at.ordinal());
        let declination = declination(day);
        let latitude = self.location.latitude.to_radians();

        let sunrise_angle = hour_angle(latitude, declination, SUNRISE_ELEVATION)?;
        let twilight_angle = hour_angle(latitude, declination, CIVIL_TWILIGHT_ELEVATION)?;

        let midnight_utc = at.date_naive().and_time(NaiveTime::MIN).and_utc();
        // Minutes after UTC midnight; four minutes per degree of hour angle.
        let noon_minutes = 720.0 - 4.0 * self.location.longitude - equation_of_time(day);
        let event = |offset_degrees: f64| {
            offset_minutes(midnight_utc, noon_minutes + 4.0 * offset_degrees)
        };

        let noon = event(0.0);
        let position = self.position(at);
        Some(Sun {
            dawn: event(-twilight_angle),
            sunrise: event(-sunrise_angle),
            noon,
            sunset: event(sunrise_angle),
            dusk: event(twilight_angle),
            midnight: noon - TimeDelta::hours(12),
            elevation: position.elevation.is_finite().then_some(position.elevation),
            azimuth: position.azimuth.is_finite().then_some(position.azimuth),
        })
    }
}

impl SunProvider for SunCalculator {
    async fn get_sun(&self, at: Timestamp) -> Result<Option<Sun>, SunHashError> {
        Ok(self.sun_at(at))
    }
}

/// Solar declination in radians for a day of the year.
fn declination(day: f64) -> f64 {
    (23.45 * (360.0 / 365.0 * (day + 284.0) * PI / 180.0).sin()).to_radians()
}

/// Difference between apparent and mean solar time, in minutes.
fn equation_of_time(day: f64) -> f64 {
    let b = (360.0 / 365.0 * (day - 81.0)).to_radians();
    9.87 * (2.0 * b).sin() - 7.53 * b.cos() - 1.5 * b.sin()
}

/// Hour angle, in degrees, at which the sun crosses `elevation`.
fn hour_angle(latitude: f64, declination: f64, elevation: f64) -> Option<f64> {
    let cos = (elevation.to_radians().sin() - latitude.sin() * declination.sin())
        / (latitude.cos() * declination.cos());
    (-1.0..=1.0)
        .contains(&cos)
        .then(|| cos.acos().to_degrees())
}

#[allow(clippy::cast_possible_truncation)]
fn offset_minutes(origin: Timestamp, minutes: f64) -> Timestamp {
    origin + TimeDelta::milliseconds((minutes * 60_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn stockholm() -> SunCalculator {
        SunCalculator::new(Location::new(59.3293, 18.0686).unwrap())
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn should_compute_midsummer_events_when_in_stockholm() {
        let sun = stockholm().sun_at(utc(2024, 6, 21, 12, 0)).unwrap();

        assert!(sun.sunrise > utc(2024, 6, 21, 1, 0) && sun.sunrise < utc(2024, 6, 21, 2, 0));
        assert!(sun.sunset > utc(2024, 6, 21, 19, 30) && sun.sunset < utc(2024, 6, 21, 20, 45));
        assert!(sun.noon > utc(2024, 6, 21, 10, 30) && sun.noon < utc(2024, 6, 21, 11, 10));
        assert!(sun.dawn < sun.sunrise && sun.dusk > sun.sunset);
        assert!(sun.daylight() > TimeDelta::hours(18));
    }

    #[test]
    fn should_peak_at_expected_elevation_when_at_solar_noon() {
        let calculator = stockholm();
        let sun = calculator.sun_at(utc(2024, 6, 21, 12, 0)).unwrap();

        let position = calculator.position(sun.noon);

        assert!((position.elevation - 54.1).abs() < 0.5, "{position:?}");
        assert!((position.azimuth - 180.0).abs() < 2.0, "{position:?}");
    }

    #[test]
    fn should_place_sun_below_horizon_when_at_night() {
        let position = stockholm().position(utc(2024, 12, 21, 0, 0));
        assert!(position.elevation < 0.0);
    }

    #[test]
    fn should_report_twelve_hours_of_daylight_when_at_equator_on_equinox() {
        let calculator = SunCalculator::new(Location::new(0.0, 0.0).unwrap());
        let sun = calculator.sun_at(utc(2024, 3, 20, 12, 0)).unwrap();

        assert!(sun.daylight() > TimeDelta::hours(12));
        assert!(sun.daylight() < TimeDelta::minutes(12 * 60 + 15));
        assert!(sun.is_daylight(utc(2024, 3, 20, 12, 0)));
        assert!(!sun.is_daylight(utc(2024, 3, 20, 2, 0)));
    }

    #[test]
    fn should_return_none_when_polar_day_or_night() {
        let tromso = SunCalculator::new(Location::new(69.65, 18.96).unwrap());
        assert!(tromso.sun_at(utc(2024, 6, 21, 12, 0)).is_none());
        assert!(tromso.sun_at(utc(2024, 12, 21, 12, 0)).is_none());
    }

    #[test]
    fn should_reject_out_of_range_coordinates() {
        assert_eq!(
            Location::new(91.0, 0.0),
            Err(VirtualError::InvalidLatitude(91.0))
        );
        assert_eq!(
            Location::new(0.0, -181.0),
            Err(VirtualError::InvalidLongitude(-181.0))
        );
    }

    #[tokio::test]
    async fn should_provide_sun_through_port() {
        let sun = stockholm().get_sun(utc(2024, 6, 21, 12, 0)).await.unwrap();
        assert!(sun.is_some_and(|s| s.elevation.is_some()));
    }
}
