use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, SunHashError, ValidationError};
use crate::id::{
    EnergySourceId, HomeForecastProviderId, MinerId, NotifierId, OptimizationUnitId,
    PerformanceTrackerId, PolicyId,
};

/// Binds a policy, a set of miners and an energy source into one decision cycle.
///
/// A unit can be stored half-configured. [`validate_configuration`](Self::validate_configuration)
/// is checked before a unit is enabled and again at the start of every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationUnit {
    pub id: OptimizationUnitId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub policy_id: Option<PolicyId>,
    #[serde(default)]
    pub target_miner_ids: Vec<MinerId>,
    #[serde(default)]
    pub energy_source_id: Option<EnergySourceId>,
    #[serde(default)]
    pub home_forecast_provider_id: Option<HomeForecastProviderId>,
    #[serde(default)]
    pub performance_tracker_id: Option<PerformanceTrackerId>,
    #[serde(default)]
    pub notifier_ids: Vec<NotifierId>,
}

impl OptimizationUnit {
    #[must_use]
    pub fn builder() -> OptimizationUnitBuilder {
        OptimizationUnitBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] if `name` is empty.
    pub fn validate(&self) -> Result<(), SunHashError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// Check that the unit has everything a cycle needs.
    ///
    /// # Errors
    ///
    /// Returns the first missing binding: policy, energy source, then miners.
    pub fn validate_configuration(&self) -> Result<(), ConfigurationError> {
        if self.policy_id.is_none() {
            return Err(ConfigurationError::MissingPolicy { unit: self.id });
        }
        if self.energy_source_id.is_none() {
            return Err(ConfigurationError::MissingEnergySource { unit: self.id });
        }
        if self.target_miner_ids.is_empty() {
            return Err(ConfigurationError::NoTargetMiners { unit: self.id });
        }
        Ok(())
    }

    /// Enable the unit once its configuration is complete.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] and leaves the unit disabled if a
    /// binding is missing.
    pub fn enable(&mut self) -> Result<(), ConfigurationError> {
        self.validate_configuration()?;
        self.enabled = true;
        Ok(())
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn assign_policy(&mut self, policy_id: PolicyId) {
        self.policy_id = Some(policy_id);
    }

    pub fn assign_energy_source(&mut self, energy_source_id: EnergySourceId) {
        self.energy_source_id = Some(energy_source_id);
    }

    pub fn assign_home_forecast_provider(&mut self, id: Option<HomeForecastProviderId>) {
        self.home_forecast_provider_id = id;
    }

    pub fn assign_performance_tracker(&mut self, id: Option<PerformanceTrackerId>) {
        self.performance_tracker_id = id;
    }

    /// Returns `false` if the miner was already targeted.
    pub fn add_miner(&mut self, miner_id: MinerId) -> bool {
        if self.target_miner_ids.contains(&miner_id) {
            return false;
        }
        self.target_miner_ids.push(miner_id);
        true
    }

    /// Returns `false` if the miner was not targeted.
    ///
    /// Removing the last miner of an enabled unit disables it.
    pub fn remove_miner(&mut self, miner_id: MinerId) -> bool {
        let before = self.target_miner_ids.len();
        self.target_miner_ids.retain(|id| *id != miner_id);
        if self.target_miner_ids.is_empty() {
            self.enabled = false;
        }
        self.target_miner_ids.len() != before
    }

    pub fn add_notifier(&mut self, notifier_id: NotifierId) -> bool {
        if self.notifier_ids.contains(&notifier_id) {
            return false;
        }
        self.notifier_ids.push(notifier_id);
        true
    }

    pub fn remove_notifier(&mut self, notifier_id: NotifierId) -> bool {
        let before = self.notifier_ids.len();
        self.notifier_ids.retain(|id| *id != notifier_id);
        self.notifier_ids.len() != before
    }
}

#[derive(Debug, Default)]
pub struct OptimizationUnitBuilder {
    id: Option<OptimizationUnitId>,
    name: Option<String>,
    description: Option<String>,
    enabled: bool,
    policy_id: Option<PolicyId>,
    target_miner_ids: Vec<MinerId>,
    energy_source_id: Option<EnergySourceId>,
    home_forecast_provider_id: Option<HomeForecastProviderId>,
    performance_tracker_id: Option<PerformanceTrackerId>,
    notifier_ids: Vec<NotifierId>,
}

impl OptimizationUnitBuilder {
    #[must_use]
    pub fn id(mut self, id: OptimizationUnitId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn policy_id(mut self, id: PolicyId) -> Self {
        self.policy_id = Some(id);
        self
    }

    #[must_use]
    pub fn target_miner(mut self, id: MinerId) -> Self {
        self.target_miner_ids.push(id);
        self
    }

    #[must_use]
    pub fn energy_source_id(mut self, id: EnergySourceId) -> Self {
        self.energy_source_id = Some(id);
        self
    }

    #[must_use]
    pub fn home_forecast_provider_id(mut self, id: HomeForecastProviderId) -> Self {
        self.home_forecast_provider_id = Some(id);
        self
    }

    #[must_use]
    pub fn performance_tracker_id(mut self, id: PerformanceTrackerId) -> Self {
        self.performance_tracker_id = Some(id);
        self
    }

    #[must_use]
    pub fn notifier_id(mut self, id: NotifierId) -> Self {
        self.notifier_ids.push(id);
        self
    }

    /// Consume the builder, validate, and return an [`OptimizationUnit`].
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] if the name is missing, or
    /// [`SunHashError::Configuration`] if the unit is enabled without a
    /// complete configuration.
    pub fn build(self) -> Result<OptimizationUnit, SunHashError> {
        let mut target_miner_ids = self.target_miner_ids;
        dedup_in_order(&mut target_miner_ids);
        let mut notifier_ids = self.notifier_ids;
        dedup_in_order(&mut notifier_ids);

        let unit = OptimizationUnit {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            enabled: self.enabled,
            policy_id: self.policy_id,
            target_miner_ids,
            energy_source_id: self.energy_source_id,
            home_forecast_provider_id: self.home_forecast_provider_id,
            performance_tracker_id: self.performance_tracker_id,
            notifier_ids,
        };
        unit.validate()?;
        if unit.enabled {
            unit.validate_configuration()?;
        }
        Ok(unit)
    }
}

fn dedup_in_order<T: PartialEq + Copy>(items: &mut Vec<T>) {
    let mut seen = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(*item);
            true
        }
    });
}
