//! Time and timestamp helpers.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta, Utc};

/// UTC timestamp used for measurements, forecasts and decision cycles.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Wall-clock time of day of `at` in the installation's local offset.
#[must_use]
pub fn local_time_of_day(at: Timestamp, offset: FixedOffset) -> NaiveTime {
    at.with_timezone(&offset).time()
}

/// Length of a [`TimeDelta`] in fractional hours.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn hours(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_shift_time_of_day_by_offset() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 22, 30, 0).unwrap();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            local_time_of_day(at, offset),
            NaiveTime::from_hms_opt(0, 30, 0).unwrap()
        );
    }

    #[test]
    fn should_convert_delta_to_fractional_hours() {
        assert!((hours(TimeDelta::minutes(90)) - 1.5).abs() < f64::EPSILON);
    }
}
