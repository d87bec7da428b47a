//! # Pulse Events
//!
//! The contract between the popularity engine and whatever stores the raw
//! event history. The engine never sees rows: it asks an `EventQueryProvider`
//! windowed aggregate questions ("how many sessions did game 7 have
//! yesterday?", "what is the busiest day any game ever had?").
//!
//! `InMemoryEventStore` is a complete provider over process-local data; the
//! PostgreSQL provider lives in the `database` crate.

pub mod error;
pub mod memory;
pub mod provider;

pub use error::{QueryError, RecordError};
pub use memory::{EventSnapshot, InMemoryEventStore};
pub use provider::{EventQueryProvider, FleetMetric, Grouping, LeaderboardFilter};
