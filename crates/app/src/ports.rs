//! Port definitions: the traits adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.
//!
//! Collaborator ports return `Ok(None)` when the capability is not configured
//! and an error when it is configured but cannot answer.

pub mod energy;
pub mod miner;
pub mod notifier;
pub mod storage;

pub use energy::{EnergyMonitor, ForecastProvider, HomeForecastProvider, SunProvider};
pub use miner::{MinerController, PerformanceTracker};
pub use notifier::Notifier;
pub use storage::{
    EnergySourceRepository, MinerRepository, OptimizationUnitRepository, PolicyRepository,
    Repositories,
};

/// Stand-in for optional collaborators that a deployment does not provide.
///
/// Every call answers "not configured".
#[derive(Debug, Clone, Copy, Default)]
pub struct NotConfigured;
