//! The typed conditions a rule is made of.
//!
//! A clause reads one value from the [`DecisionalContext`] and compares it
//! with a literal. A value that is absent from the context (no forecast, no
//! battery, ...) makes the clause fail; it is never an error.

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::DecisionalContext;
use crate::error::RuleError;
use crate::miner::MinerStatus;
use crate::time::local_time_of_day;

/// Tolerance applied by [`Operator::Eq`] on floating point values.
const EQ_TOLERANCE: f64 = 1e-6;

/// Furthest a forecast lookup may look ahead, in hours.
pub const MAX_FORECAST_HORIZON_HOURS: f64 = 24.0 * 366.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    InRange,
}

impl Operator {
    fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Eq => "==",
            Self::InRange => "in",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Literal a value is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Value(f64),
    Range { min: f64, max: f64 },
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Range { min, max } => write!(f, "[{min}, {max}]"),
        }
    }
}

/// An operator applied to an operand, e.g. `> 2000`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Comparison {
    operator: Operator,
    value: Operand,
}

impl Comparison {
    fn check(self) -> Result<(), RuleError> {
        match (self.operator, self.value) {
            (Operator::InRange, Operand::Range { min, max }) => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(RuleError::NonFiniteOperand);
                }
                if min > max {
                    return Err(RuleError::InvertedRange { min, max });
                }
                Ok(())
            }
            (Operator::InRange, Operand::Value(_)) => Err(RuleError::OperandMismatch {
                operator: Operator::InRange.symbol(),
                expected: "a range",
            }),
            (operator, Operand::Range { .. }) => Err(RuleError::OperandMismatch {
                operator: operator.symbol(),
                expected: "a single value",
            }),
            (_, Operand::Value(v)) if !v.is_finite() => Err(RuleError::NonFiniteOperand),
            (_, Operand::Value(_)) => Ok(()),
        }
    }

    fn holds(self, actual: f64) -> bool {
        match (self.operator, self.value) {
            (Operator::Gt, Operand::Value(v)) => actual > v,
            (Operator::Lt, Operand::Value(v)) => actual < v,
            (Operator::Gte, Operand::Value(v)) => actual >= v,
            (Operator::Lte, Operand::Value(v)) => actual <= v,
            (Operator::Eq, Operand::Value(v)) => (actual - v).abs() <= EQ_TOLERANCE,
            (Operator::InRange, Operand::Range { min, max }) => min <= actual && actual <= max,
            _ => false,
        }
    }
}

/// A numeric value read from the decisional context.
///
/// Power is in W, energy in Wh, state of charge in %, hash rate in TH/s,
/// sun angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "energy_state.production")]
    Production,
    #[serde(rename = "energy_state.consumption")]
    Consumption,
    #[serde(rename = "energy_state.surplus")]
    Surplus,
    #[serde(rename = "energy_state.battery.state_of_charge")]
    BatteryStateOfCharge,
    #[serde(rename = "energy_state.battery.remaining_capacity")]
    BatteryRemainingCapacity,
    #[serde(rename = "energy_state.battery.current_power")]
    BatteryPower,
    #[serde(rename = "energy_state.battery.charging_power")]
    BatteryChargingPower,
    #[serde(rename = "energy_state.battery.discharging_power")]
    BatteryDischargingPower,
    #[serde(rename = "energy_state.grid.current_power")]
    GridPower,
    #[serde(rename = "energy_state.grid.importing_power")]
    GridImportingPower,
    #[serde(rename = "energy_state.grid.exporting_power")]
    GridExportingPower,
    #[serde(rename = "energy_state.external_source")]
    ExternalSource,
    #[serde(rename = "tracker_current_hashrate")]
    TrackerHashRate,
    #[serde(rename = "miner.hash_rate")]
    MinerHashRate,
    #[serde(rename = "miner.power_consumption")]
    MinerPowerConsumption,
    #[serde(rename = "forecast.next_hour_power")]
    ForecastNextHourPower,
    #[serde(rename = "forecast.next_hour_energy")]
    ForecastNextHourEnergy,
    #[serde(rename = "forecast.avg_next_4_hours_power")]
    ForecastAvgNextFourHoursPower,
    #[serde(rename = "home_load_forecast.next_hour_average")]
    HomeLoadNextHourAverage,
    #[serde(rename = "sun.elevation")]
    SunElevation,
    #[serde(rename = "sun.minutes_since_sunrise")]
    MinutesSinceSunrise,
    #[serde(rename = "sun.minutes_until_sunset")]
    MinutesUntilSunset,
}

impl Metric {
    /// Read the metric from `ctx`, `None` when the context lacks it.
    #[must_use]
    pub fn read(self, ctx: &DecisionalContext<'_>) -> Option<f64> {
        let state = ctx.energy_state;
        let at = ctx.timestamp;
        match self {
            Self::Production => Some(state.production.0),
            Self::Consumption => Some(state.consumption.current_power.0),
            Self::Surplus => Some(state.surplus().0),
            Self::BatteryStateOfCharge => state.battery.map(|b| b.state_of_charge.0),
            Self::BatteryRemainingCapacity => state.battery.map(|b| b.remaining_capacity.0),
            Self::BatteryPower => state.battery.map(|b| b.current_power.0),
            Self::BatteryChargingPower => state.battery.map(|b| b.charging_power().0),
            Self::BatteryDischargingPower => state.battery.map(|b| b.discharging_power().0),
            Self::GridPower => state.grid.map(|g| g.current_power.0),
            Self::GridImportingPower => state.grid.map(|g| g.importing_power().0),
            Self::GridExportingPower => state.grid.map(|g| g.exporting_power().0),
            Self::ExternalSource => state.external_source.map(|w| w.0),
            Self::TrackerHashRate => ctx.tracker_hash_rate.map(|h| h.as_terahashes()),
            Self::MinerHashRate => ctx.miner.hash_rate.map(|h| h.as_terahashes()),
            Self::MinerPowerConsumption => ctx.miner.power_consumption.map(|w| w.0),
            Self::ForecastNextHourPower => ctx.forecast?.next_hour_power(at).map(|w| w.0),
            Self::ForecastNextHourEnergy => ctx.forecast?.next_hour_energy(at).map(|e| e.0),
            Self::ForecastAvgNextFourHoursPower => ctx
                .forecast?
                .avg_power_between(at, at + TimeDelta::hours(4))
                .map(|w| w.0),
            Self::HomeLoadNextHourAverage => ctx
                .home_load_forecast?
                .next_hour_average(at)
                .map(|w| w.0),
            Self::SunElevation => ctx.sun?.elevation,
            Self::MinutesSinceSunrise => ctx.sun?.time_since_sunrise(at).map(minutes),
            Self::MinutesUntilSunset => ctx.sun?.time_until_sunset(at).map(minutes),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn minutes(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 / 60.0
}

/// One condition of an [`AutomationRule`](super::AutomationRule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Clause {
    /// Compare a context metric with a literal.
    Threshold {
        field: Metric,
        operator: Operator,
        value: Operand,
    },
    /// Compare the production forecast `hours_ahead` hours after the context timestamp.
    ForecastLookup {
        hours_ahead: f64,
        operator: Operator,
        value: Operand,
    },
    /// Require the local time of day to fall in `[after, before)`. Wraps past midnight
    /// when `after` is later than `before`.
    TimeWindow {
        #[serde(with = "clock_time")]
        after: NaiveTime,
        #[serde(with = "clock_time")]
        before: NaiveTime,
    },
    /// Require the evaluated miner to be in a given status.
    StateEquals { status: MinerStatus },
    /// Require the sun to be up, or down.
    Daylight { daylight: bool },
}

impl Clause {
    /// Reject malformed clauses before any evaluation happens.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] describing the first problem found.
    pub fn check(&self) -> Result<(), RuleError> {
        match self {
            Self::Threshold {
                operator, value, ..
            } => Comparison {
                operator: *operator,
                value: *value,
            }
            .check(),
            Self::ForecastLookup {
                hours_ahead,
                operator,
                value,
            } => {
                if !(0.0..=MAX_FORECAST_HORIZON_HOURS).contains(hours_ahead) {
                    return Err(RuleError::InvalidHorizon(*hours_ahead));
                }
                Comparison {
                    operator: *operator,
                    value: *value,
                }
                .check()
            }
            Self::TimeWindow { after, before } => {
                if after == before {
                    Err(RuleError::EmptyTimeWindow)
                } else {
                    Ok(())
                }
            }
            Self::StateEquals { .. } | Self::Daylight { .. } => Ok(()),
        }
    }

    /// Whether the clause holds for `ctx`.
    #[must_use]
    pub fn holds(&self, ctx: &DecisionalContext<'_>) -> bool {
        match self {
            Self::Threshold {
                field,
                operator,
                value,
            } => field.read(ctx).is_some_and(|actual| {
                Comparison {
                    operator: *operator,
                    value: *value,
                }
                .holds(actual)
            }),
            Self::ForecastLookup {
                hours_ahead,
                operator,
                value,
            } => {
                let Some(forecast) = ctx.forecast else {
                    return false;
                };
                if !(0.0..=MAX_FORECAST_HORIZON_HOURS).contains(hours_ahead) {
                    return false;
                }
                #[allow(clippy::cast_possible_truncation)]
                let Some(at) = TimeDelta::try_milliseconds((hours_ahead * 3_600_000.0).round() as i64)
                    .and_then(|offset| ctx.timestamp.checked_add_signed(offset))
                else {
                    return false;
                };
                forecast
                    .power_at(at)
                    .is_some_and(|power| {
                        Comparison {
                            operator: *operator,
                            value: *value,
                        }
                        .holds(power.0)
                    })
            }
            Self::TimeWindow { after, before } => {
                let now = local_time_of_day(ctx.timestamp, ctx.utc_offset);
                if after < before {
                    *after <= now && now < *before
                } else {
                    now >= *after || now < *before
                }
            }
            Self::StateEquals { status } => ctx.miner.status == *status,
            Self::Daylight { daylight } => ctx
                .sun
                .is_some_and(|sun| sun.is_daylight(ctx.timestamp) == *daylight),
        }
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Threshold {
                field,
                operator,
                value,
            } => write!(f, "{field:?} {operator} {value}"),
            Self::ForecastLookup {
                hours_ahead,
                operator,
                value,
            } => write!(f, "forecast(+{hours_ahead}h) {operator} {value}"),
            Self::TimeWindow { after, before } => write!(
                f,
                "time_window({}..{})",
                after.format("%H:%M"),
                before.format("%H:%M")
            ),
            Self::StateEquals { status } => write!(f, "miner_status == {status}"),
            Self::Daylight { daylight } => write!(f, "daylight == {daylight}"),
        }
    }
}

/// `HH:MM` (or `HH:MM:SS`) wall-clock times.
mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M:%S"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map_err(D::Error::custom)
    }
}
