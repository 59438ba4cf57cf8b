//! Astronomical sun data for one day at the installation's location.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Solar events of a day plus, optionally, the sun's position at sampling time.
///
/// Angles are in degrees. Durations are derived from the event times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sun {
    /// Start of civil twilight in the morning.
    pub dawn: Timestamp,
    pub sunrise: Timestamp,
    pub noon: Timestamp,
    pub sunset: Timestamp,
    /// End of civil twilight in the evening.
    pub dusk: Timestamp,
    pub midnight: Timestamp,
    pub elevation: Option<f64>,
    /// Clockwise from north.
    pub azimuth: Option<f64>,
}

impl Sun {
    #[must_use]
    pub fn daylight(&self) -> TimeDelta {
        self.sunset - self.sunrise
    }

    /// Morning twilight plus evening twilight.
    #[must_use]
    pub fn twilight(&self) -> TimeDelta {
        (self.sunrise - self.dawn) + (self.dusk - self.sunset)
    }

    #[must_use]
    pub fn night(&self) -> TimeDelta {
        TimeDelta::days(1) - (self.dusk - self.dawn)
    }

    /// Angle between the sun and the zenith.
    #[must_use]
    pub fn zenith(&self) -> Option<f64> {
        self.elevation.map(|e| 90.0 - e)
    }

    #[must_use]
    pub fn is_daylight(&self, at: Timestamp) -> bool {
        self.sunrise <= at && at < self.sunset
    }

    /// Elapsed time since sunrise, `None` before it.
    #[must_use]
    pub fn time_since_sunrise(&self, at: Timestamp) -> Option<TimeDelta> {
        (at >= self.sunrise).then(|| at - self.sunrise)
    }

    /// Remaining time until sunset, `None` after it.
    #[must_use]
    pub fn time_until_sunset(&self, at: Timestamp) -> Option<TimeDelta> {
        (at <= self.sunset).then(|| self.sunset - at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, 21, hour, minute, 0).unwrap()
    }

    fn summer_day() -> Sun {
        Sun {
            dawn: at(3, 30),
            sunrise: at(4, 10),
            noon: at(11, 45),
            sunset: at(19, 20),
            dusk: at(20, 0),
            midnight: at(23, 45),
            elevation: Some(60.0),
            azimuth: Some(180.0),
        }
    }

    #[test]
    fn should_derive_durations_from_events() {
        let sun = summer_day();
        assert_eq!(sun.daylight(), TimeDelta::minutes(15 * 60 + 10));
        assert_eq!(sun.twilight(), TimeDelta::minutes(80));
        assert_eq!(sun.night(), TimeDelta::minutes(24 * 60 - 16 * 60 - 30));
        assert_eq!(sun.zenith(), Some(30.0));
    }

    #[test]
    fn should_report_daylight_between_sunrise_and_sunset() {
        let sun = summer_day();
        assert!(sun.is_daylight(at(12, 0)));
        assert!(!sun.is_daylight(at(3, 0)));
        assert!(!sun.is_daylight(at(19, 20)));
    }

    #[test]
    fn should_measure_time_relative_to_sunrise_and_sunset() {
        let sun = summer_day();
        assert_eq!(
            sun.time_since_sunrise(at(5, 10)),
            Some(TimeDelta::hours(1))
        );
        assert_eq!(sun.time_since_sunrise(at(4, 0)), None);
        assert_eq!(
            sun.time_until_sunset(at(18, 20)),
            Some(TimeDelta::hours(1))
        );
        assert_eq!(sun.time_until_sunset(at(20, 0)), None);
    }
}
