//! Miner operational status, commands and controller readings.

use serde::{Deserialize, Serialize};

use super::HashRate;
use crate::units::Watts;

/// Operational status of a miner.
///
/// `Starting` and `Stopping` mean a command was accepted by the controller
/// and the miner is waiting for the hardware to confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinerStatus {
    Off,
    Starting,
    On,
    Stopping,
    Error,
    #[default]
    Unknown,
}

impl MinerStatus {
    #[must_use]
    pub fn is_transitional(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }
}

impl std::fmt::Display for MinerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Starting => f.write_str("starting"),
            Self::On => f.write_str("on"),
            Self::Stopping => f.write_str("stopping"),
            Self::Error => f.write_str("error"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinerCommand {
    Start,
    Stop,
}

impl std::fmt::Display for MinerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
        }
    }
}

/// Result of applying a command to a miner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    Transitioned { from: MinerStatus, to: MinerStatus },
    /// The miner is already where the command would take it.
    NoOp,
}

/// What a controller reports about the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinerReading {
    pub status: MinerStatus,
    pub hash_rate: Option<HashRate>,
    pub power: Option<Watts>,
}

impl MinerReading {
    #[must_use]
    pub fn status(status: MinerStatus) -> Self {
        Self {
            status,
            hash_rate: None,
            power: None,
        }
    }
}

/// How a controller reading relates to the miner's logical status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The reading agrees with the current status.
    InSync,
    /// A pending command was confirmed and the status moved.
    Confirmed { from: MinerStatus, to: MinerStatus },
    /// The hardware has not finished the pending command yet.
    Pending,
    /// The controller could not tell.
    Inconclusive,
    /// No command was pending and the hardware is settled in another
    /// state, e.g. after a manual power cycle. The reading was adopted.
    Reconciled { from: MinerStatus, to: MinerStatus },
    /// The reading contradicts a pending command and was not adopted.
    Diverged { reported: MinerStatus },
}
