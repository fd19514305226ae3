//! Atomic read-modify-write over several records.
//!
//! A [`TransactionalWork`] reads records through a [`Transaction`], decides
//! what to change, and stages the changes. The [`TransactionRunner`] commits
//! everything staged as one [`Commit`]; when another writer got there first
//! the commit is rejected as a whole and the work runs again from scratch
//! against fresh state.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use common::AggregateId;
use entity_store::{Commit, EntityStore, EventEnvelope, StoreError, StreamAppend, Version};
use uuid::Uuid;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::config::BookingConfig;
use crate::error::DomainError;
use crate::repository::load_record;

/// One attempt at a multi-record write.
pub struct Transaction<'s, S: EntityStore + ?Sized> {
    store: &'s S,
    id: Uuid,
    reads: HashMap<AggregateId, Version>,
    staged: Vec<StreamAppend>,
}

impl<'s, S: EntityStore + ?Sized> Transaction<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            id: Uuid::new_v4(),
            reads: HashMap::new(),
            staged: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Loads a record and remembers the version read.
    ///
    /// A record that doesn't exist yet comes back as `A::default()`; staging
    /// its creation makes the commit fail if someone else creates it first.
    pub async fn load<A: Aggregate>(&mut self, id: AggregateId) -> Result<A, DomainError> {
        let aggregate: A = load_record(self.store, id).await?;
        self.reads.entry(id).or_insert(aggregate.version());
        Ok(aggregate)
    }

    /// Loads a record, returning `None` if it doesn't exist.
    pub async fn load_existing<A: Aggregate>(
        &mut self,
        id: AggregateId,
    ) -> Result<Option<A>, DomainError> {
        let aggregate: A = self.load(id).await?;
        Ok(aggregate.is_created().then_some(aggregate))
    }

    /// Queues changes for a record and applies them to `aggregate`.
    ///
    /// `aggregate` must be the value returned by [`Transaction::load`] for
    /// `id`, so its version is the one the commit will be checked against.
    pub fn stage<A: Aggregate>(
        &mut self,
        id: AggregateId,
        aggregate: &mut A,
        events: Vec<A::Event>,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let base = aggregate.version();
        let mut version = base;
        let mut envelopes = Vec::with_capacity(events.len());
        for event in &events {
            version = version.next();
            envelopes.push(self.envelope::<A>(id, version, event)?);
        }

        aggregate.apply_events(events);
        aggregate.set_version(version);

        match self.staged.iter_mut().find(|s| s.aggregate_id == id) {
            Some(stream) => stream.events.extend(envelopes),
            None => {
                let expected = self.reads.get(&id).copied().unwrap_or(base);
                self.staged.push(StreamAppend::new(id, expected, envelopes));
            }
        }

        Ok(())
    }

    /// Number of changes queued so far.
    pub fn staged_count(&self) -> usize {
        self.staged.iter().map(|s| s.events.len()).sum()
    }

    fn envelope<A: Aggregate>(
        &self,
        id: AggregateId,
        version: Version,
        event: &A::Event,
    ) -> Result<EventEnvelope, DomainError> {
        EventEnvelope::builder()
            .aggregate_id(id)
            .aggregate_type(A::aggregate_type())
            .event_type(event.event_type())
            .version(version)
            .payload(event)?
            .transaction_id(self.id)
            .build()
            .ok_or_else(|| {
                DomainError::Store(StoreError::InvalidCommit(format!(
                    "incomplete change for record {id}"
                )))
            })
    }

    /// Writes everything staged as one commit. Nothing staged, nothing written.
    pub async fn commit(self) -> Result<Vec<Version>, DomainError> {
        if self.staged.is_empty() {
            return Ok(Vec::new());
        }

        let mut commit = Commit::with_transaction_id(self.id);
        for stream in self.staged {
            commit.push(stream);
        }

        Ok(self.store.commit(commit).await?)
    }
}

/// A unit of work run inside a transaction.
///
/// `run` may be called several times for one request: each call gets a fresh
/// transaction and must start over from what it reads there.
#[async_trait]
pub trait TransactionalWork<S: EntityStore + ?Sized>: Send {
    type Output: Send;

    async fn run(&mut self, tx: &mut Transaction<'_, S>) -> Result<Self::Output, DomainError>;
}

/// Runs work in transactions, retrying on write conflicts.
#[derive(Clone)]
pub struct TransactionRunner<S> {
    store: S,
    config: BookingConfig,
}

impl<S: EntityStore> TransactionRunner<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, BookingConfig::default())
    }

    pub fn with_config(store: S, config: BookingConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Runs `work` and commits what it staged.
    ///
    /// Only a conflicting commit is retried. An error returned by the work
    /// itself ends the transaction immediately with nothing written.
    pub async fn transact<W>(&self, work: &mut W) -> Result<W::Output, DomainError>
    where
        W: TransactionalWork<S>,
    {
        let started = Instant::now();
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            let mut tx = Transaction::new(&self.store);
            let output = work.run(&mut tx).await?;
            let transaction_id = tx.id();
            let changes = tx.staged_count();

            match tx.commit().await {
                Ok(_) => {
                    tracing::debug!(%transaction_id, attempt, changes, "transaction committed");
                    metrics::histogram!("booking_transaction_seconds")
                        .record(started.elapsed().as_secs_f64());
                    return Ok(output);
                }
                Err(DomainError::Store(e)) if e.is_conflict() => {
                    tracing::debug!(%transaction_id, attempt, error = %e, "write conflict");
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.backoff_after(attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(attempts = max_attempts, "transaction gave up after repeated conflicts");
        Err(DomainError::TransactionAborted {
            attempts: max_attempts,
        })
    }
}
