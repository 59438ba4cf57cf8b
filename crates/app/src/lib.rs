//! # sunhash-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `EnergyMonitor`, `ForecastProvider`, `HomeForecastProvider`, `SunProvider`
//!   - `MinerController`, `PerformanceTracker`, `Notifier`
//!   - `MinerRepository`, `PolicyRepository`, `EnergySourceRepository`,
//!     `OptimizationUnitRepository`
//! - Define **driving/inbound ports** as use-case structs:
//!   - `OptimizationService`: run decision cycles for one or all units
//!   - `ConfigurationService`: register miners and sources, edit policies and units
//!   - `MinerActionService`: manual start/stop, status refresh
//! - Assemble the decisional context from collaborators, each call bounded by a timeout
//!
//! ## Dependency rule
//! Depends on `sunhash-domain` only (plus `tokio` for timeouts).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
