//! # sunhash-adapter-virtual
//!
//! Virtual/demo collaborators that let the decision engine run without any
//! real hardware.
//!
//! ## Provided collaborators
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`SunCalculator`] | `SunProvider` | Sun events and position from latitude/longitude |
//! | [`VirtualEnergyMonitor`] | `EnergyMonitor` | Clear-sky production, household load, battery and grid flows |
//! | [`VirtualForecastProvider`] | `ForecastProvider` | 24 hourly intervals of clear-sky production |
//! | [`VirtualHomeForecast`] | `HomeForecastProvider` | Hourly household load predictions |
//! | [`VirtualMinerController`] | `MinerController` | Confirms start/stop after a number of status polls |
//! | [`VirtualPerformanceTracker`] | `PerformanceTracker` | Sum of the hash rate of running virtual miners |
//! | [`TracingNotifier`] | `Notifier` | Writes notifications to the log |
//!
//! Everything is deterministic: the same instant always yields the same
//! production and load, which keeps the simulation usable in tests.
//!
//! ## Dependency rule
//!
//! Depends on `sunhash-app` (port traits) and `sunhash-domain` only.

mod energy;
mod error;
mod forecast;
mod miner;
mod notifier;
mod sun;

pub use energy::{SolarProfile, VirtualEnergyMonitor};
pub use error::VirtualError;
pub use forecast::{VirtualForecastProvider, VirtualHomeForecast};
pub use miner::{VirtualMinerController, VirtualPerformanceTracker};
pub use notifier::TracingNotifier;
pub use sun::{Location, SunCalculator};
