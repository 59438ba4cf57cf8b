//! # sunhash-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `sunhash-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Store each aggregate as a JSON document next to its listing columns
//!
//! ## Dependency rule
//! Depends on `sunhash-app` (for port traits) and `sunhash-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod document;
mod energy_source_repo;
pub mod error;
mod miner_repo;
mod policy_repo;
pub mod pool;
mod store;
mod unit_repo;

pub use store::SqliteStore;
