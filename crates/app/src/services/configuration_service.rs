//! Use-cases for editing miners, energy sources, policies and units.

use sunhash_domain::energy::EnergySource;
use sunhash_domain::error::{ConfigurationError, NotFoundError, SunHashError};
use sunhash_domain::id::{
    EnergySourceId, HomeForecastProviderId, MinerId, NotifierId, OptimizationUnitId,
    PerformanceTrackerId, PolicyId, RuleId,
};
use sunhash_domain::miner::Miner;
use sunhash_domain::optimization_unit::OptimizationUnit;
use sunhash_domain::policy::{AutomationRule, OptimizationPolicy, RuleSet};

use crate::ports::Repositories;

/// Application service for everything an operator configures.
pub struct ConfigurationService<R> {
    repo: R,
}

fn not_found(entity: &'static str, id: impl ToString) -> SunHashError {
    NotFoundError {
        entity,
        id: id.to_string(),
    }
    .into()
}

impl<R: Repositories> ConfigurationService<R> {
    /// Create a new service backed by the given repositories.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Register or replace a miner after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, miner), fields(miner_name = %miner.name))]
    pub async fn register_miner(&self, miner: Miner) -> Result<Miner, SunHashError> {
        miner.validate()?;
        self.repo.save_miner(miner).await
    }

    /// Look up a miner by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] when no miner with `id` exists,
    /// or a storage error from the repository.
    pub async fn get_miner(&self, id: MinerId) -> Result<Miner, SunHashError> {
        self.repo
            .get_miner(id)
            .await?
            .ok_or_else(|| not_found("Miner", id))
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_miners(&self) -> Result<Vec<Miner>, SunHashError> {
        self.repo.list_miners().await
    }

    /// Include or exclude a miner from every decision cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn set_miner_active(&self, id: MinerId, active: bool) -> Result<Miner, SunHashError> {
        let mut miner = self.get_miner(id).await?;
        if active {
            miner.activate();
        } else {
            miner.deactivate();
        }
        self.repo.save_miner(miner).await
    }

    /// Register or replace an energy source.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] if invariants fail, or a
    /// storage error.
    #[tracing::instrument(skip(self, source), fields(source_name = %source.name))]
    pub async fn register_energy_source(
        &self,
        source: EnergySource,
    ) -> Result<EnergySource, SunHashError> {
        source.validate()?;
        self.repo.save_energy_source(source).await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] or a storage error.
    pub async fn get_energy_source(&self, id: EnergySourceId) -> Result<EnergySource, SunHashError> {
        self.repo
            .get_energy_source(id)
            .await?
            .ok_or_else(|| not_found("EnergySource", id))
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_energy_sources(&self) -> Result<Vec<EnergySource>, SunHashError> {
        self.repo.list_energy_sources().await
    }

    /// Create or replace a policy.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] if the name is empty or a rule
    /// sits in both sets, or a storage error.
    #[tracing::instrument(skip(self, policy), fields(policy_name = %policy.name))]
    pub async fn create_policy(
        &self,
        policy: OptimizationPolicy,
    ) -> Result<OptimizationPolicy, SunHashError> {
        policy.validate()?;
        self.repo.save_policy(policy).await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] or a storage error.
    pub async fn get_policy(&self, id: PolicyId) -> Result<OptimizationPolicy, SunHashError> {
        self.repo
            .get_policy(id)
            .await?
            .ok_or_else(|| not_found("OptimizationPolicy", id))
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_policies(&self) -> Result<Vec<OptimizationPolicy>, SunHashError> {
        self.repo.list_policies().await
    }

    /// Add or replace a rule in one of the policy's sets.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] for an unknown policy,
    /// [`SunHashError::Validation`] for a malformed rule or one already in
    /// the other set, or a storage error.
    #[tracing::instrument(skip(self, rule), fields(rule_name = %rule.name))]
    pub async fn add_rule(
        &self,
        policy_id: PolicyId,
        set: RuleSet,
        rule: AutomationRule,
    ) -> Result<OptimizationPolicy, SunHashError> {
        let mut policy = self.get_policy(policy_id).await?;
        policy.add_rule(set, rule)?;
        self.repo.save_policy(policy).await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] for an unknown policy or rule, or
    /// a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_rule(
        &self,
        policy_id: PolicyId,
        rule_id: RuleId,
    ) -> Result<OptimizationPolicy, SunHashError> {
        let mut policy = self.get_policy(policy_id).await?;
        policy.remove_rule(rule_id)?;
        self.repo.save_policy(policy).await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] for an unknown policy or rule, or
    /// a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn set_rule_enabled(
        &self,
        policy_id: PolicyId,
        rule_id: RuleId,
        enabled: bool,
    ) -> Result<OptimizationPolicy, SunHashError> {
        let mut policy = self.get_policy(policy_id).await?;
        policy.set_rule_enabled(rule_id, enabled)?;
        self.repo.save_policy(policy).await
    }

    /// Create or replace a unit.
    ///
    /// Every referenced policy, energy source and miner must exist. An
    /// enabled unit must also be completely configured.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`], [`SunHashError::Configuration`],
    /// [`SunHashError::NotFound`] for a dangling reference, or a storage error.
    #[tracing::instrument(skip(self, unit), fields(unit_name = %unit.name))]
    pub async fn create_unit(
        &self,
        unit: OptimizationUnit,
    ) -> Result<OptimizationUnit, SunHashError> {
        unit.validate()?;
        self.check_references(&unit).await?;
        if unit.enabled {
            unit.validate_configuration()?;
        }
        self.repo.save_unit(unit).await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] or a storage error.
    pub async fn get_unit(&self, id: OptimizationUnitId) -> Result<OptimizationUnit, SunHashError> {
        self.repo
            .get_unit(id)
            .await?
            .ok_or_else(|| not_found("OptimizationUnit", id))
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_units(&self) -> Result<Vec<OptimizationUnit>, SunHashError> {
        self.repo.list_units().await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] for an unknown unit or policy, or
    /// a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn assign_policy(
        &self,
        unit_id: OptimizationUnitId,
        policy_id: PolicyId,
    ) -> Result<OptimizationUnit, SunHashError> {
        self.get_policy(policy_id).await?;
        self.update_unit(unit_id, |unit| {
            unit.assign_policy(policy_id);
            Ok(())
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] for an unknown unit or source, or
    /// a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn assign_energy_source(
        &self,
        unit_id: OptimizationUnitId,
        source_id: EnergySourceId,
    ) -> Result<OptimizationUnit, SunHashError> {
        self.get_energy_source(source_id).await?;
        self.update_unit(unit_id, |unit| {
            unit.assign_energy_source(source_id);
            Ok(())
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] or a storage error.
    pub async fn assign_home_forecast_provider(
        &self,
        unit_id: OptimizationUnitId,
        provider: Option<HomeForecastProviderId>,
    ) -> Result<OptimizationUnit, SunHashError> {
        self.update_unit(unit_id, |unit| {
            unit.assign_home_forecast_provider(provider);
            Ok(())
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] or a storage error.
    pub async fn assign_performance_tracker(
        &self,
        unit_id: OptimizationUnitId,
        tracker: Option<PerformanceTrackerId>,
    ) -> Result<OptimizationUnit, SunHashError> {
        self.update_unit(unit_id, |unit| {
            unit.assign_performance_tracker(tracker);
            Ok(())
        })
        .await
    }

    /// Add a miner to the unit's targets. Adding it twice changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] for an unknown unit or miner, or
    /// a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn add_target_miner(
        &self,
        unit_id: OptimizationUnitId,
        miner_id: MinerId,
    ) -> Result<OptimizationUnit, SunHashError> {
        self.get_miner(miner_id).await?;
        self.update_unit(unit_id, |unit| {
            unit.add_miner(miner_id);
            Ok(())
        })
        .await
    }

    /// Remove a miner from the unit's targets.
    ///
    /// Removing the last miner disables the unit.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] if the unit is unknown or does not
    /// target the miner, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_target_miner(
        &self,
        unit_id: OptimizationUnitId,
        miner_id: MinerId,
    ) -> Result<OptimizationUnit, SunHashError> {
        self.update_unit(unit_id, |unit| {
            if unit.remove_miner(miner_id) {
                Ok(())
            } else {
                Err(not_found("Miner", miner_id))
            }
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] or a storage error.
    pub async fn add_notifier(
        &self,
        unit_id: OptimizationUnitId,
        notifier_id: NotifierId,
    ) -> Result<OptimizationUnit, SunHashError> {
        self.update_unit(unit_id, |unit| {
            unit.add_notifier(notifier_id);
            Ok(())
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] if the unit is unknown or does not
    /// use the notifier, or a storage error.
    pub async fn remove_notifier(
        &self,
        unit_id: OptimizationUnitId,
        notifier_id: NotifierId,
    ) -> Result<OptimizationUnit, SunHashError> {
        self.update_unit(unit_id, |unit| {
            if unit.remove_notifier(notifier_id) {
                Ok(())
            } else {
                Err(not_found("Notifier", notifier_id))
            }
        })
        .await
    }

    /// Enable a unit whose configuration is complete and whose references resolve.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Configuration`] for an incomplete unit,
    /// [`SunHashError::NotFound`] for a dangling reference, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn enable_unit(
        &self,
        unit_id: OptimizationUnitId,
    ) -> Result<OptimizationUnit, SunHashError> {
        let mut unit = self.get_unit(unit_id).await?;
        unit.validate_configuration()?;
        self.check_references(&unit).await?;
        unit.enable()?;
        tracing::info!("unit enabled");
        self.repo.save_unit(unit).await
    }

    /// Disable a unit. A cycle already running sends no further command.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn disable_unit(
        &self,
        unit_id: OptimizationUnitId,
    ) -> Result<OptimizationUnit, SunHashError> {
        self.update_unit(unit_id, |unit| {
            unit.disable();
            Ok(())
        })
        .await
    }

    async fn update_unit(
        &self,
        unit_id: OptimizationUnitId,
        change: impl FnOnce(&mut OptimizationUnit) -> Result<(), SunHashError>,
    ) -> Result<OptimizationUnit, SunHashError> {
        let mut unit = self.get_unit(unit_id).await?;
        change(&mut unit)?;
        self.repo.save_unit(unit).await
    }

    async fn check_references(&self, unit: &OptimizationUnit) -> Result<(), SunHashError> {
        if let Some(policy_id) = unit.policy_id {
            if self.repo.get_policy(policy_id).await?.is_none() {
                return Err(ConfigurationError::UnknownPolicy {
                    unit: unit.id,
                    policy: policy_id,
                }
                .into());
            }
        }
        if let Some(source_id) = unit.energy_source_id {
            self.get_energy_source(source_id).await?;
        }
        for miner_id in &unit.target_miner_ids {
            self.get_miner(*miner_id).await?;
        }
        Ok(())
    }
}
