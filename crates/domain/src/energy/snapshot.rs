//! Point-in-time energy measurements.
//!
//! Sign conventions: positive battery power is charging, positive grid power
//! is importing. Derived quantities are computed on read and are never negative.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;
use crate::units::{Percentage, WattHours, Watts};

/// Household load, excluding the miners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadState {
    pub current_power: Watts,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryState {
    pub state_of_charge: Percentage,
    pub remaining_capacity: WattHours,
    pub current_power: Watts,
    pub timestamp: Timestamp,
}

impl BatteryState {
    #[must_use]
    pub fn charging_power(&self) -> Watts {
        self.current_power.positive_part()
    }

    #[must_use]
    pub fn discharging_power(&self) -> Watts {
        self.current_power.negative_part()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridState {
    pub current_power: Watts,
    pub timestamp: Timestamp,
}

impl GridState {
    #[must_use]
    pub fn importing_power(&self) -> Watts {
        self.current_power.positive_part()
    }

    #[must_use]
    pub fn exporting_power(&self) -> Watts {
        self.current_power.negative_part()
    }
}

/// Everything the energy monitor knows about a source at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyStateSnapshot {
    pub production: Watts,
    pub consumption: LoadState,
    pub battery: Option<BatteryState>,
    pub grid: Option<GridState>,
    pub external_source: Option<Watts>,
    pub timestamp: Timestamp,
}

impl EnergyStateSnapshot {
    /// Production left after the household load. Negative when the house draws more.
    #[must_use]
    pub fn surplus(&self) -> Watts {
        self.production - self.consumption.current_power
    }
}
