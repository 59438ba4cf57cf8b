//! Typed identifier newtypes backed by UUIDs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`Miner`](crate::miner::Miner).
    MinerId
);

define_id!(
    /// Unique identifier for the controller capability driving a miner.
    MinerControllerId
);

define_id!(
    /// Unique identifier for an [`EnergySource`](crate::energy::EnergySource).
    EnergySourceId
);

define_id!(
    /// Unique identifier for the monitor capability reading an energy source.
    EnergyMonitorId
);

define_id!(
    /// Unique identifier for the forecast capability attached to an energy source.
    ForecastProviderId
);

define_id!(
    /// Unique identifier for a household load forecast capability.
    HomeForecastProviderId
);

define_id!(
    /// Unique identifier for a hash rate tracking capability.
    PerformanceTrackerId
);

define_id!(
    /// Unique identifier for a notification channel.
    NotifierId
);

define_id!(
    /// Unique identifier for an [`OptimizationPolicy`](crate::policy::OptimizationPolicy).
    PolicyId
);

define_id!(
    /// Unique identifier for an [`AutomationRule`](crate::policy::AutomationRule).
    RuleId
);

define_id!(
    /// Unique identifier for an [`OptimizationUnit`](crate::optimization_unit::OptimizationUnit).
    OptimizationUnitId
);
