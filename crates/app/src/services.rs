//! Application services: the use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod configuration_service;
pub mod context_assembler;
pub mod in_flight;
pub mod miner_action_service;
pub mod optimization_service;
