//! Simulated energy monitor.
//!
//! Solar production follows the sun's elevation. Household load is a flat
//! base with morning and evening peaks in local solar time. A battery,
//! when the source has one, absorbs surplus and covers deficits down to a
//! reserve; the grid takes whatever remains.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::Timelike;

use sunhash_app::ports::EnergyMonitor;
use sunhash_domain::energy::{
    BatteryState, EnergySource, EnergySourceType, EnergyStateSnapshot, GridState, LoadState,
};
use sunhash_domain::error::{DataUnavailableError, SunHashError};
use sunhash_domain::id::EnergySourceId;
use sunhash_domain::time::{Timestamp, hours, now};
use sunhash_domain::units::{Percentage, WattHours, Watts};

use crate::sun::SunCalculator;

const MAX_BATTERY_POWER: f64 = 3000.0;
/// Below this state of charge the battery stops discharging.
const BATTERY_RESERVE: f64 = 20.0;

/// Shape of the simulated installation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarProfile {
    /// Production with the sun at the zenith, for sources without a nominal maximum.
    pub peak_production: Watts,
    /// Household load outside of the daily peaks.
    pub base_load: Watts,
}

impl Default for SolarProfile {
    fn default() -> Self {
        Self {
            peak_production: Watts(5000.0),
            base_load: Watts(400.0),
        }
    }
}

impl SolarProfile {
    /// Clear-sky production of `source` at `at`.
    #[must_use]
    pub fn production(&self, sun: &SunCalculator, source: &EnergySource, at: Timestamp) -> Watts {
        let max = source.nominal_power_max.unwrap_or(self.peak_production);
        match source.source_type {
            EnergySourceType::Solar => {
                let elevation = sun.position(at).elevation.to_radians();
                Watts(max.0 * elevation.sin().max(0.0))
            }
            EnergySourceType::Grid => Watts::ZERO,
            _ => max,
        }
    }

    /// Household load at `at`, higher around breakfast and in the evening.
    #[must_use]
    pub fn household_load(&self, longitude: f64, at: Timestamp) -> Watts {
        let hour = (f64::from(at.hour()) + f64::from(at.minute()) / 60.0 + longitude / 15.0)
            .rem_euclid(24.0);
        let factor = if (18.0..22.0).contains(&hour) {
            1.6
        } else if (7.0..9.0).contains(&hour) {
            1.3
        } else {
            1.0
        };
        Watts(self.base_load.0 * factor)
    }
}

#[derive(Debug, Clone, Copy)]
struct SimulatedBattery {
    state_of_charge: f64,
    updated_at: Timestamp,
}

pub struct VirtualEnergyMonitor {
    sun: SunCalculator,
    profile: SolarProfile,
    initial_state_of_charge: Percentage,
    batteries: Mutex<HashMap<EnergySourceId, SimulatedBattery>>,
    offline: AtomicBool,
}

impl VirtualEnergyMonitor {
    #[must_use]
    pub fn new(sun: SunCalculator, profile: SolarProfile) -> Self {
        Self {
            sun,
            profile,
            initial_state_of_charge: Percentage(60.0),
            batteries: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_initial_state_of_charge(mut self, state_of_charge: Percentage) -> Self {
        self.initial_state_of_charge = state_of_charge;
        self
    }

    /// Simulate a monitor that cannot be reached.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Simulated readings of `source` at `at`.
    ///
    /// Battery state carries over between calls for the same source.
    #[must_use]
    pub fn state_at(&self, source: &EnergySource, at: Timestamp) -> EnergyStateSnapshot {
        let production = self.profile.production(&self.sun, source, at);
        let load = self
            .profile
            .household_load(self.sun.location().longitude(), at);
        let net = production.0 + source.external_source.map_or(0.0, |w| w.0) - load.0;

        let battery = source.storage.map(|storage| {
            let mut batteries = self
                .batteries
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let state = batteries.entry(source.id).or_insert(SimulatedBattery {
                state_of_charge: self.initial_state_of_charge.0,
                updated_at: at,
            });

            let power = if net > 0.0 && state.state_of_charge < 100.0 {
                net.min(MAX_BATTERY_POWER)
            } else if net < 0.0 && state.state_of_charge > BATTERY_RESERVE {
                -(-net).min(MAX_BATTERY_POWER)
            } else {
                0.0
            };
            let elapsed = hours(at - state.updated_at).clamp(0.0, 1.0);
            let capacity = storage.nominal_capacity.0;
            state.state_of_charge =
                (state.state_of_charge + power * elapsed / capacity * 100.0).clamp(0.0, 100.0);
            state.updated_at = at;

            BatteryState {
                state_of_charge: Percentage(state.state_of_charge),
                remaining_capacity: WattHours(capacity * state.state_of_charge / 100.0),
                current_power: Watts(power),
                timestamp: at,
            }
        });

        let battery_power = battery.map_or(0.0, |b| b.current_power.0);
        let grid = source.grid.map(|_| GridState {
            current_power: Watts(battery_power - net),
            timestamp: at,
        });

        EnergyStateSnapshot {
            production,
            consumption: LoadState {
                current_power: load,
                timestamp: at,
            },
            battery,
            grid,
            external_source: source.external_source,
            timestamp: at,
        }
    }
}

impl EnergyMonitor for VirtualEnergyMonitor {
    async fn get_current_energy_state(
        &self,
        source: &EnergySource,
    ) -> Result<EnergyStateSnapshot, SunHashError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(DataUnavailableError::new("energy monitor", "simulated outage").into());
        }
        let snapshot = self.state_at(source, now());
        tracing::debug!(
            source = %source.name,
            production = %snapshot.production,
            load = %snapshot.consumption.current_power,
            "simulated energy state"
        );
        Ok(snapshot)
    }
}
