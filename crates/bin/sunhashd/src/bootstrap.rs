//! Seed data loaded at startup.
//!
//! The seed file describes energy sources, miners, policies and units and
//! refers to them by name. Loading it again updates the aggregates in
//! place: an entry whose name is already stored keeps the stored id, and a
//! known miner keeps its last status.

use std::path::Path;

use serde::Deserialize;

use sunhash_app::ports::Repositories;
use sunhash_app::services::configuration_service::ConfigurationService;
use sunhash_domain::energy::{Battery, EnergySource, EnergySourceType, Grid};
use sunhash_domain::error::SunHashError;
use sunhash_domain::id::{
    EnergyMonitorId, EnergySourceId, ForecastProviderId, HomeForecastProviderId, NotifierId,
    PerformanceTrackerId,
};
use sunhash_domain::miner::{HashRate, Miner};
use sunhash_domain::optimization_unit::OptimizationUnit;
use sunhash_domain::policy::{AutomationRule, Clause, OptimizationPolicy, RuleSet};
use sunhash_domain::units::{WattHours, Watts};

/// Collaborator ids handed to seeded sources and units.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collaborators {
    pub energy_monitor: EnergyMonitorId,
    pub forecast_provider: ForecastProviderId,
    pub home_forecast: HomeForecastProviderId,
    pub performance_tracker: PerformanceTrackerId,
    pub notifier: NotifierId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub energy_sources: Vec<EnergySourceSeed>,
    pub miners: Vec<MinerSeed>,
    pub policies: Vec<PolicySeed>,
    pub units: Vec<UnitSeed>,
}

#[derive(Debug, Deserialize)]
pub struct EnergySourceSeed {
    pub name: String,
    #[serde(default)]
    pub source_type: EnergySourceType,
    pub nominal_power_max: Option<f64>,
    /// Battery capacity in Wh.
    pub battery_capacity: Option<f64>,
    pub grid_contracted_power: Option<f64>,
    pub external_source: Option<f64>,
    /// Attach the production forecast provider.
    #[serde(default = "enabled")]
    pub forecast: bool,
}

#[derive(Debug, Deserialize)]
pub struct MinerSeed {
    pub name: String,
    /// In TH/s.
    pub hash_rate_max: Option<f64>,
    pub power_consumption_max: Option<f64>,
    #[serde(default = "enabled")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct PolicySeed {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub start_rules: Vec<RuleSeed>,
    #[serde(default)]
    pub stop_rules: Vec<RuleSeed>,
}

#[derive(Debug, Deserialize)]
pub struct RuleSeed {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Deserialize)]
pub struct UnitSeed {
    pub name: String,
    pub description: Option<String>,
    pub policy: String,
    pub energy_source: String,
    pub miners: Vec<String>,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub home_forecast: bool,
    #[serde(default)]
    pub performance_tracker: bool,
    /// Send notifications to the log.
    #[serde(default = "enabled")]
    pub notify: bool,
}

fn enabled() -> bool {
    true
}

/// How many aggregates of each kind were written.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Seeded {
    pub energy_sources: usize,
    pub miners: usize,
    pub policies: usize,
    pub units: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to read seed file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file")]
    Parse(#[from] toml::de::Error),

    #[error("unit {unit} refers to unknown {kind} {name:?}")]
    UnknownReference {
        unit: String,
        kind: &'static str,
        name: String,
    },

    #[error("seed entry {name:?} is invalid")]
    Invalid {
        name: String,
        #[source]
        source: SunHashError,
    },

    #[error(transparent)]
    Storage(#[from] SunHashError),
}

impl Seed {
    /// # Errors
    ///
    /// Returns [`BootstrapError::Io`] or [`BootstrapError::Parse`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BootstrapError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Write every seeded aggregate through the configuration use-cases.
    ///
    /// Sources, miners and policies are written before the units that
    /// refer to them.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Invalid`] for an entry that breaks a domain
    /// invariant and [`BootstrapError::UnknownReference`] for a unit naming
    /// something the seed and the store do not know.
    pub async fn apply<R: Repositories>(
        &self,
        service: &ConfigurationService<R>,
        collaborators: &Collaborators,
    ) -> Result<Seeded, BootstrapError> {
        let mut seeded = Seeded::default();

        let stored_sources = service.list_energy_sources().await?;
        for entry in &self.energy_sources {
            let existing = stored_sources.iter().find(|s| s.name == entry.name);
            let source = entry
                .build(existing.map(|s| s.id), collaborators)
                .map_err(|source| invalid(&entry.name, source))?;
            service
                .register_energy_source(source)
                .await
                .map_err(|source| invalid(&entry.name, source))?;
            seeded.energy_sources += 1;
        }

        let stored_miners = service.list_miners().await?;
        for entry in &self.miners {
            let existing = stored_miners.iter().find(|m| m.name == entry.name);
            let miner = entry
                .build(existing)
                .map_err(|source| invalid(&entry.name, source))?;
            service
                .register_miner(miner)
                .await
                .map_err(|source| invalid(&entry.name, source))?;
            seeded.miners += 1;
        }

        let stored_policies = service.list_policies().await?;
        for entry in &self.policies {
            let mut policy = entry
                .build()
                .map_err(|source| invalid(&entry.name, source))?;
            if let Some(existing) = stored_policies.iter().find(|p| p.name == entry.name) {
                policy.id = existing.id;
            }
            service
                .create_policy(policy)
                .await
                .map_err(|source| invalid(&entry.name, source))?;
            seeded.policies += 1;
        }

        let sources = service.list_energy_sources().await?;
        let miners = service.list_miners().await?;
        let policies = service.list_policies().await?;
        let stored_units = service.list_units().await?;
        for entry in &self.units {
            let reference = |kind: &'static str, name: &str| BootstrapError::UnknownReference {
                unit: entry.name.clone(),
                kind,
                name: name.to_string(),
            };

            let policy = policies
                .iter()
                .find(|p| p.name == entry.policy)
                .ok_or_else(|| reference("policy", &entry.policy))?;
            let source = sources
                .iter()
                .find(|s| s.name == entry.energy_source)
                .ok_or_else(|| reference("energy source", &entry.energy_source))?;

            let mut builder = OptimizationUnit::builder()
                .name(&entry.name)
                .enabled(entry.enabled)
                .policy_id(policy.id)
                .energy_source_id(source.id);
            if let Some(existing) = stored_units.iter().find(|u| u.name == entry.name) {
                builder = builder.id(existing.id);
            }
            if let Some(description) = &entry.description {
                builder = builder.description(description);
            }
            for name in &entry.miners {
                let miner = miners
                    .iter()
                    .find(|m| &m.name == name)
                    .ok_or_else(|| reference("miner", name))?;
                builder = builder.target_miner(miner.id);
            }
            if entry.home_forecast {
                builder = builder.home_forecast_provider_id(collaborators.home_forecast);
            }
            if entry.performance_tracker {
                builder = builder.performance_tracker_id(collaborators.performance_tracker);
            }
            if entry.notify {
                builder = builder.notifier_id(collaborators.notifier);
            }

            let unit = builder
                .build()
                .map_err(|source| invalid(&entry.name, source))?;
            service
                .create_unit(unit)
                .await
                .map_err(|source| invalid(&entry.name, source))?;
            seeded.units += 1;
        }

        Ok(seeded)
    }
}

impl EnergySourceSeed {
    fn build(
        &self,
        id: Option<EnergySourceId>,
        collaborators: &Collaborators,
    ) -> Result<EnergySource, SunHashError> {
        let mut builder = EnergySource::builder()
            .name(&self.name)
            .source_type(self.source_type)
            .energy_monitor_id(collaborators.energy_monitor);
        if let Some(id) = id {
            builder = builder.id(id);
        }
        if let Some(max) = self.nominal_power_max {
            builder = builder.nominal_power_max(Watts(max));
        }
        if let Some(capacity) = self.battery_capacity {
            builder = builder.storage(Battery::new(WattHours(capacity))?);
        }
        if let Some(contracted) = self.grid_contracted_power {
            builder = builder.grid(Grid::new(Watts(contracted))?);
        }
        if let Some(external) = self.external_source {
            builder = builder.external_source(Watts(external));
        }
        if self.forecast {
            builder = builder.forecast_provider_id(collaborators.forecast_provider);
        }
        builder.build()
    }
}

impl MinerSeed {
    fn build(&self, existing: Option<&Miner>) -> Result<Miner, SunHashError> {
        let mut builder = Miner::builder().name(&self.name).active(self.active);
        if let Some(existing) = existing {
            builder = builder.id(existing.id).status(existing.status);
        }
        if let Some(max) = self.hash_rate_max {
            builder = builder.hash_rate_max(HashRate::terahashes(max));
        }
        if let Some(max) = self.power_consumption_max {
            builder = builder.power_consumption_max(Watts(max));
        }
        builder.build()
    }
}

impl PolicySeed {
    fn build(&self) -> Result<OptimizationPolicy, SunHashError> {
        let mut policy = OptimizationPolicy::new(&self.name)?;
        policy.description.clone_from(&self.description);
        for (set, rules) in [
            (RuleSet::Start, &self.start_rules),
            (RuleSet::Stop, &self.stop_rules),
        ] {
            for rule in rules {
                policy.add_rule(set, rule.build()?)?;
            }
        }
        Ok(policy)
    }
}

impl RuleSeed {
    fn build(&self) -> Result<AutomationRule, SunHashError> {
        let mut builder = AutomationRule::builder()
            .name(&self.name)
            .priority(self.priority)
            .enabled(self.enabled);
        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        for clause in &self.clauses {
            builder = builder.clause(clause.clone());
        }
        builder.build()
    }
}

fn invalid(name: &str, source: SunHashError) -> BootstrapError {
    BootstrapError::Invalid {
        name: name.to_string(),
        source,
    }
}
