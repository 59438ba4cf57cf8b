//! Production forecast as an ordered time series of power predictions.
//!
//! A [`Forecast`] is a list of [`ForecastInterval`]s, each carrying
//! [`ForecastPowerPoint`]s. Point lookups interpolate linearly across
//! interval boundaries but never extrapolate: a timestamp outside the
//! covered range has no prediction.
//!
//! Every query takes the reference instant explicitly so that evaluation
//! stays a pure function of the decisional context.

mod interval;

pub use interval::{ForecastInterval, ForecastPowerPoint};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;
use crate::units::{WattHours, Watts};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub generated_at: Timestamp,
    pub intervals: Vec<ForecastInterval>,
}

impl Forecast {
    /// Create a forecast, ordering intervals by start.
    #[must_use]
    pub fn new(generated_at: Timestamp, mut intervals: Vec<ForecastInterval>) -> Self {
        intervals.sort_by_key(|i| i.start);
        Self {
            generated_at,
            intervals,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.iter().all(|i| i.power_points.is_empty())
    }

    /// All power points across intervals, in timestamp order.
    fn points(&self) -> Vec<ForecastPowerPoint> {
        let mut points: Vec<ForecastPowerPoint> = self
            .intervals
            .iter()
            .flat_map(|i| i.power_points.iter().copied())
            .collect();
        points.sort_by_key(|p| p.timestamp);
        points
    }

    /// Predicted power at `at`.
    ///
    /// Returns the exact value when a point sits on `at`, a linear
    /// interpolation between the surrounding points otherwise, and `None`
    /// before the first or after the last point.
    #[must_use]
    pub fn power_at(&self, at: Timestamp) -> Option<Watts> {
        let points = self.points();
        let after = points.partition_point(|p| p.timestamp < at);
        let next = points.get(after)?;
        if next.timestamp == at {
            return Some(next.power);
        }
        let previous = points.get(after.checked_sub(1)?)?;

        let span = nanoseconds(next.timestamp - previous.timestamp);
        if span <= 0.0 {
            return Some(previous.power);
        }
        let ratio = nanoseconds(at - previous.timestamp) / span;
        Some(Watts(
            previous.power.0 + (next.power.0 - previous.power.0) * ratio,
        ))
    }

    /// Energy predicted over `[start, end)`.
    ///
    /// Each overlapping interval contributes its energy prorated by the
    /// share of its duration that overlaps. `None` when no overlapping
    /// interval has an energy estimate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn energy_between(&self, start: Timestamp, end: Timestamp) -> Option<WattHours> {
        let mut total: Option<WattHours> = None;
        for interval in &self.intervals {
            let overlap = interval.overlap(start, end);
            if overlap <= TimeDelta::zero() {
                continue;
            }
            let Some(energy) = interval.estimated_energy() else {
                continue;
            };
            let ratio = overlap.num_milliseconds() as f64
                / interval.duration().num_milliseconds() as f64;
            let share = WattHours(energy.0 * ratio);
            total = Some(total.map_or(share, |acc| acc + share));
        }
        total
    }

    /// Mean of the average power of every interval overlapping `[start, end)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_power_between(&self, start: Timestamp, end: Timestamp) -> Option<Watts> {
        let averages: Vec<f64> = self
            .intervals
            .iter()
            .filter(|i| i.overlap(start, end) > TimeDelta::zero())
            .filter_map(ForecastInterval::avg_power)
            .map(|w| w.0)
            .collect();
        if averages.is_empty() {
            return None;
        }
        Some(Watts(averages.iter().sum::<f64>() / averages.len() as f64))
    }

    /// Average power of the interval covering one hour after `at`.
    #[must_use]
    pub fn next_hour_power(&self, at: Timestamp) -> Option<Watts> {
        let target = at + TimeDelta::hours(1);
        self.intervals
            .iter()
            .find(|i| i.contains(target))
            .and_then(ForecastInterval::avg_power)
    }

    /// Energy predicted for the hour starting at `at`.
    #[must_use]
    pub fn next_hour_energy(&self, at: Timestamp) -> Option<WattHours> {
        self.energy_between(at, at + TimeDelta::hours(1))
    }
}

/// Length of `delta` in nanoseconds, falling back to millisecond precision
/// for spans too long to count in nanoseconds.
#[allow(clippy::cast_precision_loss)]
fn nanoseconds(delta: TimeDelta) -> f64 {
    delta
        .num_nanoseconds()
        .map_or_else(|| delta.num_milliseconds() as f64 * 1e6, |n| n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn at(minutes: i64) -> Timestamp {
        t0() + TimeDelta::minutes(minutes)
    }

    fn point(minutes: i64, watts: f64) -> ForecastPowerPoint {
        ForecastPowerPoint::new(at(minutes), Watts(watts))
    }

    fn hourly(hour: i64, points: Vec<ForecastPowerPoint>) -> ForecastInterval {
        ForecastInterval::new(at(hour * 60), at((hour + 1) * 60), points).unwrap()
    }

    fn two_hour_forecast() -> Forecast {
        Forecast::new(
            t0(),
            vec![
                hourly(1, vec![point(60, 300.0), point(90, 500.0)]),
                hourly(0, vec![point(0, 100.0), point(30, 200.0)]),
            ],
        )
    }

    #[test]
    fn should_sort_intervals_by_start() {
        let forecast = two_hour_forecast();
        assert_eq!(forecast.intervals[0].start, t0());
        assert_eq!(forecast.intervals[1].start, at(60));
    }

    #[test]
    fn should_return_exact_value_when_timestamp_matches_point() {
        let forecast = two_hour_forecast();
        assert_eq!(forecast.power_at(at(30)), Some(Watts(200.0)));
        assert_eq!(forecast.power_at(at(0)), Some(Watts(100.0)));
    }

    #[test]
    fn should_interpolate_midpoint_between_points() {
        let forecast = Forecast::new(
            t0(),
            vec![hourly(0, vec![point(0, 100.0), point(60, 300.0)])],
        );
        assert_eq!(forecast.power_at(at(30)), Some(Watts(200.0)));
    }

    #[test]
    fn should_interpolate_across_interval_boundary() {
        let forecast = two_hour_forecast();
        // between (30, 200W) and (60, 300W)
        assert_eq!(forecast.power_at(at(45)), Some(Watts(250.0)));
    }

    #[test]
    fn should_interpolate_between_points_less_than_a_millisecond_apart() {
        let close = t0() + TimeDelta::nanoseconds(500);
        let forecast = Forecast::new(
            t0(),
            vec![hourly(
                0,
                vec![
                    point(0, 1000.0),
                    ForecastPowerPoint::new(close, Watts(2000.0)),
                ],
            )],
        );
        let power = forecast
            .power_at(t0() + TimeDelta::nanoseconds(250))
            .unwrap();
        assert!((power.0 - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn should_not_extrapolate_outside_points() {
        let forecast = two_hour_forecast();
        assert_eq!(forecast.power_at(at(-1)), None);
        assert_eq!(forecast.power_at(at(91)), None);
    }

    #[test]
    fn should_return_none_when_forecast_has_no_points() {
        let forecast = Forecast::new(t0(), vec![hourly(0, vec![])]);
        assert!(forecast.is_empty());
        assert_eq!(forecast.power_at(at(10)), None);
    }

    #[test]
    fn should_prorate_energy_over_partial_overlap() {
        let forecast = Forecast::new(
            t0(),
            vec![
                hourly(0, vec![]).with_energy(WattHours(1000.0)),
                hourly(1, vec![]).with_energy(WattHours(2000.0)),
            ],
        );
        let energy = forecast.energy_between(at(30), at(90)).unwrap();
        assert!((energy.0 - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn should_return_no_energy_when_nothing_overlaps() {
        let forecast = two_hour_forecast();
        assert_eq!(forecast.energy_between(at(180), at(240)), None);
    }

    #[test]
    fn should_average_interval_powers_in_window() {
        let forecast = two_hour_forecast();
        // interval averages are 150W and 400W
        assert_eq!(
            forecast.avg_power_between(t0(), at(120)),
            Some(Watts(275.0))
        );
    }

    #[test]
    fn should_pick_interval_one_hour_ahead_for_next_hour_power() {
        let forecast = two_hour_forecast();
        assert_eq!(forecast.next_hour_power(at(10)), Some(Watts(400.0)));
        assert_eq!(forecast.next_hour_power(at(70)), None);
    }

    #[test]
    fn should_estimate_next_hour_energy_from_average_power() {
        let forecast = two_hour_forecast();
        // first interval: 150W for 1h
        let energy = forecast.next_hour_energy(t0()).unwrap();
        assert!((energy.0 - 150.0).abs() < 1e-9);
    }
}
