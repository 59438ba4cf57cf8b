//! Energy sources and the point-in-time measurements taken from them.

mod snapshot;

pub use snapshot::{BatteryState, EnergyStateSnapshot, GridState, LoadState};

use serde::{Deserialize, Serialize};

use crate::error::{SunHashError, ValidationError};
use crate::id::{EnergyMonitorId, EnergySourceId, ForecastProviderId};
use crate::units::{WattHours, Watts, ensure_positive};

/// Kind of primary production behind an [`EnergySource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySourceType {
    #[default]
    Solar,
    Wind,
    Grid,
    Hydro,
    Other,
}

impl std::fmt::Display for EnergySourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solar => f.write_str("solar"),
            Self::Wind => f.write_str("wind"),
            Self::Grid => f.write_str("grid"),
            Self::Hydro => f.write_str("hydro"),
            Self::Other => f.write_str("other"),
        }
    }
}

/// Storage attached to an energy source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub nominal_capacity: WattHours,
}

impl Battery {
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositive`] if the capacity is not strictly positive.
    pub fn new(nominal_capacity: WattHours) -> Result<Self, ValidationError> {
        ensure_positive("battery.nominal_capacity", nominal_capacity.0)?;
        Ok(Self { nominal_capacity })
    }
}

/// Grid connection attached to an energy source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub contracted_power: Watts,
}

impl Grid {
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositive`] if the contracted power is not strictly positive.
    pub fn new(contracted_power: Watts) -> Result<Self, ValidationError> {
        ensure_positive("grid.contracted_power", contracted_power.0)?;
        Ok(Self { contracted_power })
    }
}

/// A production site feeding the miners, with optional storage and grid link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergySource {
    pub id: EnergySourceId,
    pub name: String,
    pub source_type: EnergySourceType,
    pub nominal_power_max: Option<Watts>,
    pub storage: Option<Battery>,
    pub grid: Option<Grid>,
    /// Nominal contribution of an external generator, if any.
    pub external_source: Option<Watts>,
    pub energy_monitor_id: Option<EnergyMonitorId>,
    pub forecast_provider_id: Option<ForecastProviderId>,
}

impl EnergySource {
    /// Create a builder for constructing an [`EnergySource`].
    #[must_use]
    pub fn builder() -> EnergySourceBuilder {
        EnergySourceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - any capacity or power maximum is not strictly positive
    /// - the external source contribution is negative or not finite
    pub fn validate(&self) -> Result<(), SunHashError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Some(max) = self.nominal_power_max {
            ensure_positive("nominal_power_max", max.0)?;
        }
        if let Some(battery) = self.storage {
            ensure_positive("battery.nominal_capacity", battery.nominal_capacity.0)?;
        }
        if let Some(grid) = self.grid {
            ensure_positive("grid.contracted_power", grid.contracted_power.0)?;
        }
        if let Some(external) = self.external_source {
            if !external.0.is_finite() {
                return Err(ValidationError::NonFinite {
                    field: "external_source",
                }
                .into());
            }
            if external.0 < 0.0 {
                return Err(ValidationError::OutOfRange {
                    field: "external_source",
                    value: external.0,
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn connect_storage(&mut self, battery: Battery) {
        self.storage = Some(battery);
    }

    pub fn disconnect_storage(&mut self) {
        self.storage = None;
    }

    pub fn connect_grid(&mut self, grid: Grid) {
        self.grid = Some(grid);
    }

    pub fn disconnect_grid(&mut self) {
        self.grid = None;
    }
}

/// Step-by-step builder for [`EnergySource`].
#[derive(Debug, Default)]
pub struct EnergySourceBuilder {
    id: Option<EnergySourceId>,
    name: Option<String>,
    source_type: EnergySourceType,
    nominal_power_max: Option<Watts>,
    storage: Option<Battery>,
    grid: Option<Grid>,
    external_source: Option<Watts>,
    energy_monitor_id: Option<EnergyMonitorId>,
    forecast_provider_id: Option<ForecastProviderId>,
}

impl EnergySourceBuilder {
    #[must_use]
    pub fn id(mut self, id: EnergySourceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn source_type(mut self, source_type: EnergySourceType) -> Self {
        self.source_type = source_type;
        self
    }

    #[must_use]
    pub fn nominal_power_max(mut self, max: Watts) -> Self {
        self.nominal_power_max = Some(max);
        self
    }

    #[must_use]
    pub fn storage(mut self, battery: Battery) -> Self {
        self.storage = Some(battery);
        self
    }

    #[must_use]
    pub fn grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    #[must_use]
    pub fn external_source(mut self, power: Watts) -> Self {
        self.external_source = Some(power);
        self
    }

    #[must_use]
    pub fn energy_monitor_id(mut self, id: EnergyMonitorId) -> Self {
        self.energy_monitor_id = Some(id);
        self
    }

    #[must_use]
    pub fn forecast_provider_id(mut self, id: ForecastProviderId) -> Self {
        self.forecast_provider_id = Some(id);
        self
    }

    /// Consume the builder, validate, and return an [`EnergySource`].
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] if the assembled source breaks an invariant.
    pub fn build(self) -> Result<EnergySource, SunHashError> {
        let source = EnergySource {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            source_type: self.source_type,
            nominal_power_max: self.nominal_power_max,
            storage: self.storage,
            grid: self.grid,
            external_source: self.external_source,
            energy_monitor_id: self.energy_monitor_id,
            forecast_provider_id: self.forecast_provider_id,
        };
        source.validate()?;
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_solar_source_with_battery_and_grid() {
        let source = EnergySource::builder()
            .name("Roof PV")
            .nominal_power_max(Watts(6000.0))
            .storage(Battery::new(WattHours(10_000.0)).unwrap())
            .grid(Grid::new(Watts(3000.0)).unwrap())
            .build()
            .unwrap();

        assert_eq!(source.source_type, EnergySourceType::Solar);
        assert_eq!(
            source.storage.map(|b| b.nominal_capacity),
            Some(WattHours(10_000.0))
        );
        assert!(source.grid.is_some());
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = EnergySource::builder().build();
        assert!(matches!(
            result,
            Err(SunHashError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_reject_battery_with_zero_capacity() {
        assert!(matches!(
            Battery::new(WattHours(0.0)),
            Err(ValidationError::NonPositive { .. })
        ));
    }

    #[test]
    fn should_reject_grid_with_negative_contracted_power() {
        assert!(Grid::new(Watts(-1.0)).is_err());
    }

    #[test]
    fn should_reject_non_positive_nominal_power() {
        let result = EnergySource::builder()
            .name("Wind")
            .nominal_power_max(Watts(0.0))
            .build();
        assert!(matches!(
            result,
            Err(SunHashError::Validation(ValidationError::NonPositive {
                field: "nominal_power_max",
                ..
            }))
        ));
    }

    #[test]
    fn should_revalidate_storage_loaded_without_constructor() {
        let mut source = EnergySource::builder().name("PV").build().unwrap();
        source.connect_storage(Battery {
            nominal_capacity: WattHours(-5.0),
        });
        assert!(source.validate().is_err());
        source.disconnect_storage();
        assert!(source.validate().is_ok());
    }

    #[test]
    fn should_deserialize_source_type_in_snake_case() {
        let t: EnergySourceType = serde_json::from_str("\"hydro\"").unwrap();
        assert_eq!(t, EnergySourceType::Hydro);
        assert_eq!(t.to_string(), "hydro");
    }
}
