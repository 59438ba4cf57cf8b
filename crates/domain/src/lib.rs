//! # sunhash-domain
//!
//! Pure domain model for the sunhash miner automation system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps, physical units
//! - Define **energy sources** and point-in-time **energy snapshots** (battery, grid, load)
//! - Define the **forecast** time series (interpolation, interval aggregation),
//!   the household **load forecast** and astronomical **sun** data
//! - Define **miners** and their operational state machine
//! - Define **policies**: prioritized automation rules, the rule engine and the
//!   decisional context they are evaluated against
//! - Define **optimization units** binding a policy, miners and an energy source
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! Evaluation is synchronous and side-effect free; every clock read happens
//! outside and is passed in through the [`DecisionalContext`](policy::DecisionalContext).

pub mod error;
pub mod id;
pub mod time;
pub mod units;

pub mod energy;
pub mod forecast;
pub mod home_load;
pub mod miner;
pub mod notification;
pub mod optimization_unit;
pub mod policy;
pub mod sun;
