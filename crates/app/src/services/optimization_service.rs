//! Decision cycles for optimization units.
//!
//! One cycle loads the unit, its policy and its energy source, gathers the
//! cycle inputs once, then decides and acts for each active target miner in
//! turn. A miner's status is persisted only after the controller accepted
//! the command, so a cycle dropped or cancelled halfway leaves it unchanged.
//! Only the operational state is written back; settings edited by an
//! operator while the command was in flight are kept. A storage failure on
//! one miner is reported in its outcome and the cycle moves on.

use std::collections::HashSet;
use std::time::Duration;

use sunhash_domain::energy::EnergySource;
use sunhash_domain::error::{ConfigurationError, NotFoundError, SunHashError};
use sunhash_domain::id::{MinerId, OptimizationUnitId, RuleId};
use sunhash_domain::miner::{CommandEffect, Miner, MinerCommand, MinerStatus, Observation};
use sunhash_domain::notification::{Notification, Severity};
use sunhash_domain::optimization_unit::OptimizationUnit;
use sunhash_domain::policy::{
    AutomationRule, MiningDecision, OptimizationPolicy, PolicyDecision, RejectedRule,
};
use sunhash_domain::time::{Timestamp, now};

use super::context_assembler::{CycleInputSource, CycleInputs, DEFAULT_TIMEOUT, bounded};
use super::in_flight::InFlight;
use crate::ports::{MinerController, Notifier, Repositories};

/// Result of one cycle of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub unit_id: OptimizationUnitId,
    /// One entry per target miner taking part in the cycle, in target order.
    pub outcomes: Vec<MinerOutcome>,
}

impl CycleReport {
    fn empty(unit_id: OptimizationUnitId) -> Self {
        Self {
            unit_id,
            outcomes: Vec::new(),
        }
    }

    #[must_use]
    pub fn outcome(&self, miner_id: MinerId) -> Option<&MinerOutcome> {
        self.outcomes.iter().find(|o| o.miner_id == miner_id)
    }
}

/// Identity of the rule behind a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRule {
    pub id: RuleId,
    pub name: String,
}

impl From<&AutomationRule> for MatchedRule {
    fn from(rule: &AutomationRule) -> Self {
        Self {
            id: rule.id,
            name: rule.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinerOutcome {
    pub miner_id: MinerId,
    pub decision: MiningDecision,
    pub rule: Option<MatchedRule>,
    pub action: MinerAction,
}

impl MinerOutcome {
    fn skipped(miner_id: MinerId, reason: SkipReason) -> Self {
        Self {
            miner_id,
            decision: MiningDecision::MaintainState,
            rule: None,
            action: MinerAction::Skipped(reason),
        }
    }
}

/// What the cycle did to a miner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinerAction {
    /// A start command was accepted by the controller.
    Started,
    /// A stop command was accepted by the controller.
    Stopped,
    /// Nothing to do, or the decision did not fit the miner's state.
    NoAction,
    /// The controller refused or did not answer; retried next cycle.
    CommandFailed(String),
    /// No decision was taken.
    Skipped(SkipReason),
    /// The unit was disabled before the command was sent.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EnergyStateUnavailable,
    MinerNotFound,
    /// Another cycle or a manual action holds the miner.
    InFlight,
    /// The miner could not be read or written.
    StorageFailure,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnergyStateUnavailable => f.write_str("energy state unavailable"),
            Self::MinerNotFound => f.write_str("miner not found"),
            Self::InFlight => f.write_str("miner already in a cycle"),
            Self::StorageFailure => f.write_str("miner storage failure"),
        }
    }
}

/// What stays the same for every miner of a cycle.
struct Cycle<'c> {
    unit: &'c OptimizationUnit,
    policy: &'c OptimizationPolicy,
    source: &'c EnergySource,
    inputs: &'c CycleInputs,
}

/// Orchestrator driving miners from their unit's policy.
pub struct OptimizationService<R, A, C, N> {
    repo: R,
    inputs: A,
    controller: C,
    notifier: N,
    in_flight: InFlight,
    command_timeout: Duration,
}

impl<R, A, C, N> OptimizationService<R, A, C, N>
where
    R: Repositories,
    A: CycleInputSource,
    C: MinerController,
    N: Notifier,
{
    pub fn new(repo: R, inputs: A, controller: C, notifier: N) -> Self {
        Self {
            repo,
            inputs,
            controller,
            notifier,
            in_flight: InFlight::new(),
            command_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Share the per-miner exclusion with other services.
    #[must_use]
    pub fn with_in_flight(mut self, in_flight: InFlight) -> Self {
        self.in_flight = in_flight;
        self
    }

    /// Bound for controller and notifier calls.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Run one cycle for every enabled unit.
    ///
    /// A failing unit is logged and does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the units cannot be listed.
    pub async fn run_all_enabled_units(&self) -> Result<Vec<CycleReport>, SunHashError> {
        let at = now();
        let units = self.repo.list_units().await?;
        let mut reports = Vec::new();
        for unit in units.into_iter().filter(|unit| unit.enabled) {
            match self.run_cycle_at(unit.id, at).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    tracing::error!(unit_id = %unit.id, error = %err, "optimization cycle failed");
                }
            }
        }
        Ok(reports)
    }

    /// Run one cycle for `unit_id` now.
    ///
    /// # Errors
    ///
    /// See [`run_cycle_at`](Self::run_cycle_at).
    pub async fn run_cycle(&self, unit_id: OptimizationUnitId) -> Result<CycleReport, SunHashError> {
        self.run_cycle_at(unit_id, now()).await
    }

    /// Run one cycle for `unit_id`, evaluating rules at `at`.
    ///
    /// A disabled unit yields an empty report.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::NotFound`] for an unknown unit or energy
    /// source, [`SunHashError::Configuration`] when the unit is incomplete
    /// or references an unknown policy, or a storage error.
    #[tracing::instrument(skip(self, at), fields(unit_name = tracing::field::Empty))]
    pub async fn run_cycle_at(
        &self,
        unit_id: OptimizationUnitId,
        at: Timestamp,
    ) -> Result<CycleReport, SunHashError> {
        let unit = self.repo.get_unit(unit_id).await?.ok_or_else(|| {
            SunHashError::from(NotFoundError {
                entity: "OptimizationUnit",
                id: unit_id.to_string(),
            })
        })?;
        tracing::Span::current().record("unit_name", unit.name.as_str());

        if !unit.enabled {
            tracing::info!("unit disabled, skipping cycle");
            return Ok(CycleReport::empty(unit_id));
        }

        let (policy, source) = match self.load_bindings(&unit).await {
            Ok(bindings) => bindings,
            Err(err) => {
                tracing::error!(error = %err, "unit cannot run");
                self.notify(
                    &unit,
                    Notification::new(
                        Severity::Error,
                        format!("Unit {} cannot run", unit.name),
                        err.to_string(),
                        at,
                    ),
                )
                .await;
                return Err(err);
            }
        };

        let inputs = match self.inputs.gather(&unit, &source, at).await {
            Ok(inputs) => inputs,
            Err(err) => {
                tracing::warn!(error = %err, "energy state unavailable, keeping miners as they are");
                self.notify(
                    &unit,
                    Notification::new(
                        Severity::Warning,
                        format!("Energy state of {} unavailable", source.name),
                        err.to_string(),
                        at,
                    ),
                )
                .await;
                let mut outcomes = Vec::with_capacity(unit.target_miner_ids.len());
                for miner_id in &unit.target_miner_ids {
                    if self.is_known_inactive(*miner_id).await {
                        continue;
                    }
                    outcomes.push(MinerOutcome::skipped(
                        *miner_id,
                        SkipReason::EnergyStateUnavailable,
                    ));
                }
                return Ok(CycleReport { unit_id, outcomes });
            }
        };

        let cycle = Cycle {
            unit: &unit,
            policy: &policy,
            source: &source,
            inputs: &inputs,
        };
        let mut reported = HashSet::new();
        let mut outcomes = Vec::with_capacity(unit.target_miner_ids.len());
        for miner_id in &unit.target_miner_ids {
            match self.run_for_miner(&cycle, *miner_id, &mut reported).await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(%miner_id, error = %err, "miner not processed");
                    self.notify(
                        &unit,
                        Notification::new(
                            Severity::Error,
                            "Miner not processed",
                            format!("unit {} could not process miner {miner_id}: {err}", unit.name),
                            at,
                        ),
                    )
                    .await;
                    outcomes.push(MinerOutcome::skipped(*miner_id, SkipReason::StorageFailure));
                }
            }
        }
        Ok(CycleReport { unit_id, outcomes })
    }

    /// Whether the stored miner exists and is inactive.
    ///
    /// Unknown or unreadable miners count as active so they still show up
    /// in the report.
    async fn is_known_inactive(&self, miner_id: MinerId) -> bool {
        matches!(self.repo.get_miner(miner_id).await, Ok(Some(miner)) if !miner.active)
    }

    async fn load_bindings(
        &self,
        unit: &OptimizationUnit,
    ) -> Result<(OptimizationPolicy, EnergySource), SunHashError> {
        unit.validate_configuration()?;
        let (Some(policy_id), Some(source_id)) = (unit.policy_id, unit.energy_source_id) else {
            return Err(ConfigurationError::MissingPolicy { unit: unit.id }.into());
        };
        let policy = self.repo.get_policy(policy_id).await?.ok_or(
            ConfigurationError::UnknownPolicy {
                unit: unit.id,
                policy: policy_id,
            },
        )?;
        let source = self
            .repo
            .get_energy_source(source_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "EnergySource",
                id: source_id.to_string(),
            })?;
        Ok((policy, source))
    }

    /// Decide and act for one miner. `None` for inactive miners.
    #[tracing::instrument(skip(self, cycle, reported))]
    async fn run_for_miner(
        &self,
        cycle: &Cycle<'_>,
        miner_id: MinerId,
        reported: &mut HashSet<RuleId>,
    ) -> Result<Option<MinerOutcome>, SunHashError> {
        let at = cycle.inputs.timestamp;
        let Some(_guard) = self.in_flight.try_acquire(miner_id) else {
            tracing::warn!("miner already in a cycle, skipping");
            return Ok(Some(MinerOutcome::skipped(miner_id, SkipReason::InFlight)));
        };

        let Some(mut miner) = self.repo.get_miner(miner_id).await? else {
            tracing::warn!("target miner not found");
            self.notify(
                cycle.unit,
                Notification::new(
                    Severity::Warning,
                    "Miner not found",
                    format!("unit {} targets unknown miner {miner_id}", cycle.unit.name),
                    at,
                ),
            )
            .await;
            return Ok(Some(MinerOutcome::skipped(miner_id, SkipReason::MinerNotFound)));
        };
        if !miner.active {
            tracing::debug!("miner inactive, excluded from cycle");
            return Ok(None);
        }

        self.refresh_status(cycle.unit, &mut miner, at).await?;

        let ctx = cycle.inputs.context_for(cycle.source, &miner);
        let PolicyDecision {
            decision,
            rule,
            rejected,
        } = cycle.policy.decide_next_action(&ctx);
        self.report_rejected(cycle.unit, &rejected, reported, at).await;
        let rule = rule.map(MatchedRule::from);

        tracing::debug!(
            status = %miner.status,
            %decision,
            rule = rule.as_ref().map(|r| r.name.as_str()),
            "decision taken"
        );

        let action = match decision.command() {
            Some(command) => self.execute(cycle.unit, &miner, command, at).await?,
            None => MinerAction::NoAction,
        };
        Ok(Some(MinerOutcome {
            miner_id,
            decision,
            rule,
            action,
        }))
    }

    /// Reconcile the miner with what its controller reports.
    ///
    /// A controller that cannot be read leaves the stored status in place.
    async fn refresh_status(
        &self,
        unit: &OptimizationUnit,
        miner: &mut Miner,
        at: Timestamp,
    ) -> Result<(), SunHashError> {
        let reading = match bounded(
            "miner controller",
            self.command_timeout,
            self.controller.get_status(miner),
        )
        .await
        {
            Ok(reading) => reading,
            Err(err) => {
                tracing::warn!(error = %err, "cannot read miner status, deciding on stored status");
                return Ok(());
            }
        };

        match miner.observe(&reading) {
            Observation::Confirmed { from, to } => {
                tracing::info!(%from, %to, "miner transition confirmed");
                *miner = self.repo.save_miner_status(miner.clone()).await?;
                if to == MinerStatus::Error {
                    self.notify(
                        unit,
                        Notification::new(
                            Severity::Error,
                            format!("Miner {} failed", miner.name),
                            format!("miner reported an error while {from}"),
                            at,
                        ),
                    )
                    .await;
                }
            }
            Observation::Reconciled { from, to } => {
                tracing::warn!(%from, %to, "miner status reconciled with controller");
                *miner = self.repo.save_miner_status(miner.clone()).await?;
            }
            Observation::Diverged { reported } => {
                tracing::warn!(
                    status = %miner.status,
                    %reported,
                    "controller reading contradicts pending command"
                );
            }
            Observation::InSync | Observation::Pending | Observation::Inconclusive => {}
        }
        Ok(())
    }

    /// Send `command` and persist the new status once the controller accepted it.
    async fn execute(
        &self,
        unit: &OptimizationUnit,
        miner: &Miner,
        command: MinerCommand,
        at: Timestamp,
    ) -> Result<MinerAction, SunHashError> {
        let still_enabled = self
            .repo
            .get_unit(unit.id)
            .await?
            .is_some_and(|current| current.enabled);
        if !still_enabled {
            tracing::info!(%command, "unit disabled during cycle, command not sent");
            return Ok(MinerAction::Cancelled);
        }

        let mut next = miner.clone();
        match next.apply(command) {
            Ok(CommandEffect::Transitioned { .. }) => {}
            Ok(CommandEffect::NoOp) => return Ok(MinerAction::NoAction),
            Err(err) => {
                tracing::info!(error = %err, "decision does not fit miner state, ignored");
                return Ok(MinerAction::NoAction);
            }
        }

        let sent = match command {
            MinerCommand::Start => {
                bounded(
                    "miner controller",
                    self.command_timeout,
                    self.controller.turn_on(miner),
                )
                .await
            }
            MinerCommand::Stop => {
                bounded(
                    "miner controller",
                    self.command_timeout,
                    self.controller.turn_off(miner),
                )
                .await
            }
        };

        match sent {
            Ok(()) => {
                self.repo.save_miner_status(next).await?;
                tracing::info!(%command, "miner command sent");
                let (title, action) = match command {
                    MinerCommand::Start => ("started", MinerAction::Started),
                    MinerCommand::Stop => ("stopped", MinerAction::Stopped),
                };
                self.notify(
                    unit,
                    Notification::new(
                        Severity::Info,
                        format!("Miner {} {title}", miner.name),
                        format!("optimization unit {} sent {command}", unit.name),
                        at,
                    ),
                )
                .await;
                Ok(action)
            }
            Err(err) => {
                tracing::warn!(%command, error = %err, "miner command failed, retrying next cycle");
                self.notify(
                    unit,
                    Notification::new(
                        Severity::Error,
                        format!("Cannot {command} miner {}", miner.name),
                        err.to_string(),
                        at,
                    ),
                )
                .await;
                Ok(MinerAction::CommandFailed(err.to_string()))
            }
        }
    }

    /// Notify once per cycle about each malformed rule.
    async fn report_rejected(
        &self,
        unit: &OptimizationUnit,
        rejected: &[RejectedRule],
        reported: &mut HashSet<RuleId>,
        at: Timestamp,
    ) {
        for rule in rejected {
            if !reported.insert(rule.rule_id) {
                continue;
            }
            tracing::warn!(rule_id = %rule.rule_id, rule_name = %rule.rule_name, error = %rule.error, "rule skipped");
            self.notify(
                unit,
                Notification::new(
                    Severity::Warning,
                    format!("Rule {} skipped", rule.rule_name),
                    rule.error.to_string(),
                    at,
                ),
            )
            .await;
        }
    }

    /// Deliver to every notifier of the unit. Failures are only logged.
    async fn notify(&self, unit: &OptimizationUnit, notification: Notification) {
        for notifier_id in &unit.notifier_ids {
            let delivered = bounded(
                "notifier",
                self.command_timeout,
                self.notifier.notify(*notifier_id, notification.clone()),
            )
            .await;
            if let Err(err) = delivered {
                tracing::warn!(%notifier_id, error = %err, "notification not delivered");
            }
        }
    }
}
