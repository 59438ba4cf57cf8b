//! Miners: controllable loads with an operational state machine.
//!
//! | From | Event | To |
//! |------|-------|----|
//! | `off`, `error`, `unknown` | start command | `starting` |
//! | `starting` | confirmation | `on` or `error` |
//! | `on` | stop command | `stopping` |
//! | `stopping` | confirmation | `off` or `error` |
//!
//! Starting a miner that is `on`/`starting`, or stopping one that is
//! `off`/`stopping`, is a no-op. Any other command is rejected with
//! [`TransitionError::Invalid`]. Commands only move the miner into a
//! transitional state; the final state comes from a controller reading
//! passed to [`Miner::observe`]. Outside of a pending command the hardware
//! is the source of truth: a settled reading replaces a settled status.

mod hash_rate;
mod status;

pub use hash_rate::{HashRate, HashRateUnit};
pub use status::{CommandEffect, MinerCommand, MinerReading, MinerStatus, Observation};

use serde::{Deserialize, Serialize};

use crate::error::{SunHashError, TransitionError, ValidationError};
use crate::id::{MinerControllerId, MinerId};
use crate::units::{Watts, ensure_positive};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Miner {
    pub id: MinerId,
    pub name: String,
    pub status: MinerStatus,
    pub hash_rate: Option<HashRate>,
    pub hash_rate_max: Option<HashRate>,
    pub power_consumption: Option<Watts>,
    pub power_consumption_max: Option<Watts>,
    /// Inactive miners are left alone by every decision cycle.
    pub active: bool,
    pub controller_id: Option<MinerControllerId>,
}

impl Miner {
    /// Create a builder for constructing a [`Miner`].
    #[must_use]
    pub fn builder() -> MinerBuilder {
        MinerBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - a maximum hash rate or power draw is not strictly positive
    pub fn validate(&self) -> Result<(), SunHashError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Some(max) = self.hash_rate_max {
            ensure_positive("hash_rate_max", max.value)?;
        }
        if let Some(max) = self.power_consumption_max {
            ensure_positive("power_consumption_max", max.0)?;
        }
        Ok(())
    }

    /// Request the miner to start.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Inactive`] for inactive miners and
    /// [`TransitionError::Invalid`] while the miner is stopping.
    pub fn start(&mut self) -> Result<CommandEffect, TransitionError> {
        self.ensure_active()?;
        match self.status {
            MinerStatus::Off | MinerStatus::Error | MinerStatus::Unknown => {
                Ok(self.move_to(MinerStatus::Starting))
            }
            MinerStatus::On | MinerStatus::Starting => Ok(CommandEffect::NoOp),
            MinerStatus::Stopping => Err(self.invalid(MinerCommand::Start)),
        }
    }

    /// Request the miner to stop.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Inactive`] for inactive miners and
    /// [`TransitionError::Invalid`] unless the miner is on, off or stopping.
    pub fn stop(&mut self) -> Result<CommandEffect, TransitionError> {
        self.ensure_active()?;
        match self.status {
            MinerStatus::On => Ok(self.move_to(MinerStatus::Stopping)),
            MinerStatus::Off | MinerStatus::Stopping => Ok(CommandEffect::NoOp),
            MinerStatus::Starting | MinerStatus::Error | MinerStatus::Unknown => {
                Err(self.invalid(MinerCommand::Stop))
            }
        }
    }

    /// Apply `command` through [`start`](Self::start) or [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// See the two methods above.
    pub fn apply(&mut self, command: MinerCommand) -> Result<CommandEffect, TransitionError> {
        match command {
            MinerCommand::Start => self.start(),
            MinerCommand::Stop => self.stop(),
        }
    }

    /// Reconcile the miner with a controller reading.
    ///
    /// A pending command only moves on its confirmation. A settled status
    /// (`off`, `on`, `error`, `unknown`) takes any settled reading. Hash
    /// rate and power draw are refreshed whenever the reading carries them.
    pub fn observe(&mut self, reading: &MinerReading) -> Observation {
        if let Some(hash_rate) = reading.hash_rate {
            self.hash_rate = Some(hash_rate);
        }
        if let Some(power) = reading.power {
            self.power_consumption = Some(power);
        }

        let reported = reading.status;
        if reported == self.status {
            return if self.status.is_transitional() {
                Observation::Pending
            } else {
                Observation::InSync
            };
        }
        if reported == MinerStatus::Unknown {
            return Observation::Inconclusive;
        }
        match (self.status, reported) {
            (MinerStatus::Starting, MinerStatus::On | MinerStatus::Error)
            | (MinerStatus::Stopping, MinerStatus::Off | MinerStatus::Error) => {
                let from = self.status;
                self.status = reported;
                Observation::Confirmed { from, to: reported }
            }
            (from, to) if !from.is_transitional() && !to.is_transitional() => {
                self.status = to;
                Observation::Reconciled { from, to }
            }
            _ => Observation::Diverged { reported },
        }
    }

    /// Copy status, hash rate and power draw from `other`.
    pub fn adopt_operational_state(&mut self, other: &Miner) {
        self.status = other.status;
        self.hash_rate = other.hash_rate;
        self.power_consumption = other.power_consumption;
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    fn ensure_active(&self) -> Result<(), TransitionError> {
        if self.active {
            Ok(())
        } else {
            Err(TransitionError::Inactive { miner: self.id })
        }
    }

    fn move_to(&mut self, to: MinerStatus) -> CommandEffect {
        let from = self.status;
        self.status = to;
        CommandEffect::Transitioned { from, to }
    }

    fn invalid(&self, command: MinerCommand) -> TransitionError {
        TransitionError::Invalid {
            miner: self.id,
            command,
            status: self.status,
        }
    }
}

/// Step-by-step builder for [`Miner`].
#[derive(Debug, Default)]
pub struct MinerBuilder {
    id: Option<MinerId>,
    name: Option<String>,
    status: MinerStatus,
    hash_rate_max: Option<HashRate>,
    power_consumption_max: Option<Watts>,
    active: Option<bool>,
    controller_id: Option<MinerControllerId>,
}

impl MinerBuilder {
    #[must_use]
    pub fn id(mut self, id: MinerId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: MinerStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn hash_rate_max(mut self, max: HashRate) -> Self {
        self.hash_rate_max = Some(max);
        self
    }

    #[must_use]
    pub fn power_consumption_max(mut self, max: Watts) -> Self {
        self.power_consumption_max = Some(max);
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    #[must_use]
    pub fn controller_id(mut self, id: MinerControllerId) -> Self {
        self.controller_id = Some(id);
        self
    }

    /// Consume the builder, validate, and return a [`Miner`].
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] if the assembled miner breaks an invariant.
    pub fn build(self) -> Result<Miner, SunHashError> {
        let miner = Miner {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            status: self.status,
            hash_rate: None,
            hash_rate_max: self.hash_rate_max,
            power_consumption: None,
            power_consumption_max: self.power_consumption_max,
            active: self.active.unwrap_or(true),
            controller_id: self.controller_id,
        };
        miner.validate()?;
        Ok(miner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miner(status: MinerStatus) -> Miner {
        Miner::builder()
            .name("S19")
            .status(status)
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_active_unknown_miner_by_default() {
        let m = Miner::builder().name("S19").build().unwrap();
        assert!(m.active);
        assert_eq!(m.status, MinerStatus::Unknown);
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = Miner::builder().build();
        assert!(matches!(
            result,
            Err(SunHashError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_reject_zero_power_max() {
        let result = Miner::builder()
            .name("S19")
            .power_consumption_max(Watts(0.0))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn should_move_to_starting_when_started_from_off_error_or_unknown() {
        for status in [MinerStatus::Off, MinerStatus::Error, MinerStatus::Unknown] {
            let mut m = miner(status);
            let effect = m.start().unwrap();
            assert_eq!(
                effect,
                CommandEffect::Transitioned {
                    from: status,
                    to: MinerStatus::Starting
                }
            );
            assert_eq!(m.status, MinerStatus::Starting);
        }
    }

    #[test]
    fn should_ignore_start_when_already_on_or_starting() {
        for status in [MinerStatus::On, MinerStatus::Starting] {
            let mut m = miner(status);
            assert_eq!(m.start().unwrap(), CommandEffect::NoOp);
            assert_eq!(m.status, status);
        }
    }

    #[test]
    fn should_reject_start_while_stopping() {
        let mut m = miner(MinerStatus::Stopping);
        assert!(matches!(
            m.start(),
            Err(TransitionError::Invalid {
                command: MinerCommand::Start,
                status: MinerStatus::Stopping,
                ..
            })
        ));
        assert_eq!(m.status, MinerStatus::Stopping);
    }

    #[test]
    fn should_move_to_stopping_when_stopped_from_on() {
        let mut m = miner(MinerStatus::On);
        m.stop().unwrap();
        assert_eq!(m.status, MinerStatus::Stopping);
    }

    #[test]
    fn should_ignore_stop_when_already_off_or_stopping() {
        for status in [MinerStatus::Off, MinerStatus::Stopping] {
            let mut m = miner(status);
            assert_eq!(m.stop().unwrap(), CommandEffect::NoOp);
        }
    }

    #[test]
    fn should_reject_stop_while_starting() {
        let mut m = miner(MinerStatus::Starting);
        assert!(m.stop().is_err());
        assert_eq!(m.status, MinerStatus::Starting);
    }

    #[test]
    fn should_reject_commands_on_inactive_miner() {
        let mut m = miner(MinerStatus::Off);
        m.deactivate();
        assert_eq!(
            m.start(),
            Err(TransitionError::Inactive { miner: m.id })
        );
        assert_eq!(m.status, MinerStatus::Off);
    }

    #[test]
    fn should_confirm_starting_miner_when_controller_reports_on() {
        let mut m = miner(MinerStatus::Starting);
        let reading = MinerReading {
            status: MinerStatus::On,
            hash_rate: Some(HashRate::terahashes(95.0)),
            power: Some(Watts(3250.0)),
        };
        assert_eq!(
            m.observe(&reading),
            Observation::Confirmed {
                from: MinerStatus::Starting,
                to: MinerStatus::On
            }
        );
        assert_eq!(m.status, MinerStatus::On);
        assert_eq!(m.power_consumption, Some(Watts(3250.0)));
        assert_eq!(m.hash_rate, Some(HashRate::terahashes(95.0)));
    }

    #[test]
    fn should_confirm_stopping_miner_when_controller_reports_error() {
        let mut m = miner(MinerStatus::Stopping);
        m.observe(&MinerReading::status(MinerStatus::Error));
        assert_eq!(m.status, MinerStatus::Error);
    }

    #[test]
    fn should_stay_pending_while_hardware_has_not_confirmed() {
        let mut m = miner(MinerStatus::Starting);
        assert_eq!(
            m.observe(&MinerReading::status(MinerStatus::Starting)),
            Observation::Pending
        );
        assert_eq!(m.status, MinerStatus::Starting);
    }

    #[test]
    fn should_adopt_settled_reading_when_no_command_is_pending() {
        for (stored, reported) in [
            (MinerStatus::Off, MinerStatus::On),
            (MinerStatus::Unknown, MinerStatus::On),
            (MinerStatus::On, MinerStatus::Off),
            (MinerStatus::Error, MinerStatus::Off),
        ] {
            let mut m = miner(stored);
            assert_eq!(
                m.observe(&MinerReading::status(reported)),
                Observation::Reconciled {
                    from: stored,
                    to: reported
                }
            );
            assert_eq!(m.status, reported);
        }
    }

    #[test]
    fn should_keep_pending_status_when_reading_diverges() {
        let mut m = miner(MinerStatus::Starting);
        assert_eq!(
            m.observe(&MinerReading::status(MinerStatus::Off)),
            Observation::Diverged {
                reported: MinerStatus::Off
            }
        );
        assert_eq!(m.status, MinerStatus::Starting);
    }

    #[test]
    fn should_not_adopt_transitional_reading_over_settled_status() {
        let mut m = miner(MinerStatus::Off);
        assert_eq!(
            m.observe(&MinerReading::status(MinerStatus::Starting)),
            Observation::Diverged {
                reported: MinerStatus::Starting
            }
        );
        assert_eq!(m.status, MinerStatus::Off);
    }

    #[test]
    fn should_treat_unknown_reading_as_inconclusive() {
        let mut m = miner(MinerStatus::Stopping);
        assert_eq!(
            m.observe(&MinerReading::status(MinerStatus::Unknown)),
            Observation::Inconclusive
        );
        assert_eq!(m.status, MinerStatus::Stopping);
    }

    #[test]
    fn should_adopt_operational_state_without_touching_settings() {
        let mut stored = miner(MinerStatus::Off);
        stored.deactivate();
        stored.name = "S19 renamed".to_string();
        let mut observed = stored.clone();
        observed.activate();
        observed.name = "S19".to_string();
        observed.status = MinerStatus::Starting;
        observed.power_consumption = Some(Watts(3100.0));

        stored.adopt_operational_state(&observed);

        assert_eq!(stored.status, MinerStatus::Starting);
        assert_eq!(stored.power_consumption, Some(Watts(3100.0)));
        assert!(!stored.active);
        assert_eq!(stored.name, "S19 renamed");
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let m = miner(MinerStatus::On);
        let json = serde_json::to_string(&m).unwrap();
        let parsed: Miner = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, m.id);
        assert_eq!(parsed.status, MinerStatus::On);
    }
}
