//! Optimization policies: start and stop rule sets turned into mining decisions.
//!
//! A policy owns two disjoint rule sets. Which one is consulted depends on
//! the miner's status:
//!
//! | Miner status | Rule set | On match |
//! |--------------|----------|----------|
//! | `off`, `error`, `unknown` | start rules | [`MiningDecision::StartMining`] |
//! | `on` | stop rules | [`MiningDecision::StopMining`] |
//! | `starting`, `stopping` | none | [`MiningDecision::MaintainState`] |
//!
//! Anything else, including no match, keeps the current state.

mod clause;
mod context;
mod engine;
mod rule;

pub use clause::{Clause, Metric, Operand, Operator};
pub use context::DecisionalContext;
pub use engine::{RejectedRule, RuleEngine, RuleOutcome};
pub use rule::{AutomationRule, AutomationRuleBuilder};

use serde::{Deserialize, Serialize};

use crate::error::{NotFoundError, SunHashError, ValidationError};
use crate::id::{PolicyId, RuleId};
use crate::miner::{MinerCommand, MinerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MiningDecision {
    StartMining,
    StopMining,
    MaintainState,
}

impl MiningDecision {
    /// Command the decision asks for, `None` for [`MaintainState`](Self::MaintainState).
    #[must_use]
    pub fn command(self) -> Option<MinerCommand> {
        match self {
            Self::StartMining => Some(MinerCommand::Start),
            Self::StopMining => Some(MinerCommand::Stop),
            Self::MaintainState => None,
        }
    }
}

impl std::fmt::Display for MiningDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartMining => f.write_str("START_MINING"),
            Self::StopMining => f.write_str("STOP_MINING"),
            Self::MaintainState => f.write_str("MAINTAIN_STATE"),
        }
    }
}

/// Which rule set a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    Start,
    Stop,
}

/// Outcome of [`OptimizationPolicy::decide_next_action`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDecision<'p> {
    pub decision: MiningDecision,
    /// Rule that produced the decision.
    pub rule: Option<&'p AutomationRule>,
    /// Rules skipped because they are malformed.
    pub rejected: Vec<RejectedRule>,
}

impl PolicyDecision<'_> {
    fn maintain(rejected: Vec<RejectedRule>) -> Self {
        Self {
            decision: MiningDecision::MaintainState,
            rule: None,
            rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationPolicy {
    pub id: PolicyId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_rules: Vec<AutomationRule>,
    #[serde(default)]
    pub stop_rules: Vec<AutomationRule>,
}

impl OptimizationPolicy {
    /// Create an empty policy.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] if `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, SunHashError> {
        let policy = Self {
            id: PolicyId::new(),
            name: name.into(),
            description: None,
            start_rules: Vec::new(),
            stop_rules: Vec::new(),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check domain invariants.
    ///
    /// Malformed rules are not an error here: they are isolated when loaded
    /// into the engine so that one bad rule does not disable the policy.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - a rule belongs to both sets ([`ValidationError::OverlappingRuleSets`])
    pub fn validate(&self) -> Result<(), SunHashError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Some(shared) = self
            .start_rules
            .iter()
            .find(|start| self.stop_rules.iter().any(|stop| stop.id == start.id))
        {
            return Err(ValidationError::OverlappingRuleSets { rule: shared.id }.into());
        }
        Ok(())
    }

    #[must_use]
    pub fn rules(&self, set: RuleSet) -> &[AutomationRule] {
        match set {
            RuleSet::Start => &self.start_rules,
            RuleSet::Stop => &self.stop_rules,
        }
    }

    /// Add or replace a rule in `set`.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] if the rule is malformed or
    /// already belongs to the other set.
    pub fn add_rule(&mut self, set: RuleSet, rule: AutomationRule) -> Result<(), SunHashError> {
        rule.validate()?;
        let (target, other) = match set {
            RuleSet::Start => (&mut self.start_rules, &self.stop_rules),
            RuleSet::Stop => (&mut self.stop_rules, &self.start_rules),
        };
        if other.iter().any(|r| r.id == rule.id) {
            return Err(ValidationError::OverlappingRuleSets { rule: rule.id }.into());
        }
        match target.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => target.push(rule),
        }
        Ok(())
    }

    /// Remove a rule from whichever set holds it.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] if no rule has this id.
    pub fn remove_rule(&mut self, id: RuleId) -> Result<AutomationRule, SunHashError> {
        for rules in [&mut self.start_rules, &mut self.stop_rules] {
            if let Some(index) = rules.iter().position(|r| r.id == id) {
                return Ok(rules.remove(index));
            }
        }
        Err(rule_not_found(id))
    }

    /// Enable or disable a rule in place.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] if no rule has this id.
    pub fn set_rule_enabled(&mut self, id: RuleId, enabled: bool) -> Result<(), SunHashError> {
        let rule = self
            .start_rules
            .iter_mut()
            .chain(self.stop_rules.iter_mut())
            .find(|r| r.id == id)
            .ok_or_else(|| rule_not_found(id))?;
        rule.enabled = enabled;
        Ok(())
    }

    /// Decide what to do with the miner of `ctx`.
    ///
    /// Pure: the result depends only on the rule sets and the context.
    #[must_use]
    pub fn decide_next_action(&self, ctx: &DecisionalContext<'_>) -> PolicyDecision<'_> {
        let (set, on_match) = match ctx.miner.status {
            MinerStatus::Starting | MinerStatus::Stopping => {
                return PolicyDecision::maintain(Vec::new());
            }
            MinerStatus::Off | MinerStatus::Error | MinerStatus::Unknown => {
                (RuleSet::Start, MiningDecision::StartMining)
            }
            MinerStatus::On => (RuleSet::Stop, MiningDecision::StopMining),
        };

        let mut engine = RuleEngine::new();
        let rejected = engine.load_rules(self.rules(set));
        match engine.evaluate(ctx).matched {
            Some(rule) => PolicyDecision {
                decision: on_match,
                rule: Some(rule),
                rejected,
            },
            None => PolicyDecision::maintain(rejected),
        }
    }
}

fn rule_not_found(id: RuleId) -> SunHashError {
    NotFoundError {
        entity: "AutomationRule",
        id: id.to_string(),
    }
    .into()
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{FixedOffset, TimeDelta, TimeZone, Utc};

    use super::{AutomationRule, Clause, DecisionalContext, Metric, Operand, Operator};
    use crate::energy::{BatteryState, EnergySource, EnergyStateSnapshot, GridState, LoadState};
    use crate::forecast::{Forecast, ForecastInterval, ForecastPowerPoint};
    use crate::miner::{Miner, MinerStatus};
    use crate::time::Timestamp;
    use crate::units::{Percentage, WattHours, Watts};

    pub fn production_above(watts: f64) -> Clause {
        Clause::Threshold {
            field: Metric::Production,
            operator: Operator::Gt,
            value: Operand::Value(watts),
        }
    }

    pub fn production_below(watts: f64) -> Clause {
        Clause::Threshold {
            field: Metric::Production,
            operator: Operator::Lt,
            value: Operand::Value(watts),
        }
    }

    pub fn rule(name: &str, priority: i32, clause: Clause) -> AutomationRule {
        AutomationRule::builder()
            .name(name)
            .priority(priority)
            .clause(clause)
            .build()
            .unwrap()
    }

    /// Owns everything a [`DecisionalContext`] borrows.
    pub struct Fixture {
        source: EnergySource,
        state: EnergyStateSnapshot,
        miner: Miner,
        forecast: Option<Forecast>,
        timestamp: Timestamp,
        offset: FixedOffset,
    }

    impl Fixture {
        pub fn new() -> Self {
            let timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
            Self {
                source: EnergySource::builder().name("PV").build().unwrap(),
                state: EnergyStateSnapshot {
                    production: Watts(0.0),
                    consumption: LoadState {
                        current_power: Watts(500.0),
                        timestamp,
                    },
                    battery: None,
                    grid: None,
                    external_source: None,
                    timestamp,
                },
                miner: Miner::builder()
                    .name("S19")
                    .status(MinerStatus::Off)
                    .build()
                    .unwrap(),
                forecast: None,
                timestamp,
                offset: FixedOffset::east_opt(0).unwrap(),
            }
        }

        pub fn production(mut self, watts: f64) -> Self {
            self.state.production = Watts(watts);
            self
        }

        pub fn battery_soc(mut self, soc: f64) -> Self {
            self.state.battery = Some(BatteryState {
                state_of_charge: Percentage(soc),
                remaining_capacity: WattHours(soc * 100.0),
                current_power: Watts(0.0),
                timestamp: self.timestamp,
            });
            self
        }

        pub fn grid_power(mut self, watts: f64) -> Self {
            self.state.grid = Some(GridState {
                current_power: Watts(watts),
                timestamp: self.timestamp,
            });
            self
        }

        pub fn miner_status(mut self, status: MinerStatus) -> Self {
            self.miner.status = status;
            self
        }

        /// Linear ramp from `from` now to `to` two hours later.
        pub fn forecast_ramp(mut self, from: Watts, to: Watts) -> Self {
            let end = self.timestamp + TimeDelta::hours(2);
            let interval = ForecastInterval::new(
                self.timestamp,
                end,
                vec![
                    ForecastPowerPoint::new(self.timestamp, from),
                    ForecastPowerPoint::new(end, to),
                ],
            )
            .unwrap();
            self.forecast = Some(Forecast::new(self.timestamp, vec![interval]));
            self
        }

        pub fn at_utc(mut self, hour: u32, minute: u32) -> Self {
            self.timestamp = Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap();
            self
        }

        pub fn utc_offset_hours(mut self, hours: i32) -> Self {
            self.offset = FixedOffset::east_opt(hours * 3600).unwrap();
            self
        }

        pub fn context(&self) -> DecisionalContext<'_> {
            DecisionalContext::new(&self.source, &self.state, &self.miner, self.timestamp)
                .with_forecast(self.forecast.as_ref())
                .with_utc_offset(self.offset)
        }
    }
}
