//! # Pulse Database Crate
//!
//! The PostgreSQL implementation of the `EventQueryProvider` contract, plus the
//! handful of writes the CLI needs: toggling a game's active flag and
//! recording scores, which only active games accept.
//!
//! ## Public API
//!
//! - `connect`: establishes the connection pool from `DATABASE_URL`.
//! - `run_migrations`: applies the embedded schema under `migrations/`.
//! - `PgEventStore`: the provider itself; every aggregate is pushed down into SQL.
//! - `DbError`: the specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod store;

pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use store::PgEventStore;
