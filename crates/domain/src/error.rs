//! Common error types used across the workspace.
//!
//! [`SunHashError`] is the cross-layer error. Each failure family has its own
//! typed error converted through `#[from]`; adapters box their own errors
//! into [`SunHashError::Storage`] or [`SunHashError::Adapter`].

use crate::id::{MinerId, OptimizationUnitId, PolicyId, RuleId};
use crate::miner::{MinerCommand, MinerStatus};

/// Top-level error shared by the domain, application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum SunHashError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("data unavailable: {0}")]
    DataUnavailable(#[from] DataUnavailableError),

    #[error("miner {0} already has a command in flight")]
    Busy(MinerId),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("adapter error")]
    Adapter(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant was violated at construction time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("{field} must be strictly positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} is out of range, got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("interval end must be after its start")]
    EmptyInterval,

    #[error("rule {rule} is present in both start and stop rule sets")]
    OverlappingRuleSets { rule: RuleId },

    #[error("invalid rule: {0}")]
    Rule(#[from] RuleError),
}

/// A rule clause is malformed. Detected when rules are loaded, never while evaluating.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("rule has no clauses")]
    NoClauses,

    #[error("operator `{operator}` expects {expected} operand")]
    OperandMismatch {
        operator: &'static str,
        expected: &'static str,
    },

    #[error("range is inverted: min {min} is greater than max {max}")]
    InvertedRange { min: f64, max: f64 },

    #[error("operand must be a finite number")]
    NonFiniteOperand,

    #[error("forecast horizon must be between 0 and 8784 hours, got {0}")]
    InvalidHorizon(f64),

    #[error("time window start and end must differ")]
    EmptyTimeWindow,
}

/// An entity looked up by id does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// An optimization unit is not wired well enough to run a cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("optimization unit {unit} has no policy")]
    MissingPolicy { unit: OptimizationUnitId },

    #[error("optimization unit {unit} has no energy source")]
    MissingEnergySource { unit: OptimizationUnitId },

    #[error("optimization unit {unit} has no target miners")]
    NoTargetMiners { unit: OptimizationUnitId },

    #[error("optimization unit {unit} references unknown policy {policy}")]
    UnknownPolicy {
        unit: OptimizationUnitId,
        policy: PolicyId,
    },
}

/// A miner command does not fit the miner's current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("miner {miner} cannot {command} while {status}")]
    Invalid {
        miner: MinerId,
        command: MinerCommand,
        status: MinerStatus,
    },

    #[error("miner {miner} is not active")]
    Inactive { miner: MinerId },
}

/// A collaborator could not provide the data it is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_name} is unavailable: {reason}")]
pub struct DataUnavailableError {
    pub source_name: &'static str,
    pub reason: String,
}

impl DataUnavailableError {
    #[must_use]
    pub fn new(source_name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            source_name,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_wrap_rule_error_into_validation_error() {
        let err: SunHashError = ValidationError::from(RuleError::NoClauses).into();
        assert!(matches!(
            err,
            SunHashError::Validation(ValidationError::Rule(RuleError::NoClauses))
        ));
    }

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Miner",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Miner abc not found");
    }

    #[test]
    fn should_display_invalid_transition_with_command_and_status() {
        let miner = MinerId::new();
        let err = TransitionError::Invalid {
            miner,
            command: MinerCommand::Start,
            status: MinerStatus::Stopping,
        };
        assert_eq!(
            err.to_string(),
            format!("miner {miner} cannot start while stopping")
        );
    }
}
