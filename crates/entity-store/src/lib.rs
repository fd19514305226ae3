//! Versioned record store with atomic multi-record commits.
//!
//! Every record is a stream of changes. Writers read a record, remember the
//! version they saw, and submit a [`Commit`] that only succeeds if every record
//! it touches is still at that version.

pub mod config;
pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use config::PostgresConfig;
pub use error::{Result, StoreError};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::{InMemoryEntityStore, InjectedFailure};
pub use postgres::PostgresEntityStore;
pub use store::{Commit, EntityStore, EntityStoreExt, StreamAppend};
