use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{AggregateId, EventEnvelope, Result, StoreError, Version};

/// New changes for one record, guarded by the version the writer read.
#[derive(Debug, Clone)]
pub struct StreamAppend {
    pub aggregate_id: AggregateId,

    /// Version the record must still be at for the commit to apply.
    /// `Version::initial()` means the record must not exist yet.
    pub expected_version: Version,

    /// Changes to append, versioned from `expected_version + 1`.
    pub events: Vec<EventEnvelope>,
}

impl StreamAppend {
    pub fn new(
        aggregate_id: AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Self {
        Self {
            aggregate_id,
            expected_version,
            events,
        }
    }

    /// Version of the record once this append is applied.
    pub fn resulting_version(&self) -> Version {
        self.events
            .last()
            .map(|e| e.version)
            .unwrap_or(self.expected_version)
    }
}

/// An all-or-nothing write touching one or more records.
#[derive(Debug, Clone)]
pub struct Commit {
    pub transaction_id: Uuid,
    pub streams: Vec<StreamAppend>,
}

impl Commit {
    pub fn new() -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            streams: Vec::new(),
        }
    }

    pub fn with_transaction_id(transaction_id: Uuid) -> Self {
        Self {
            transaction_id,
            streams: Vec::new(),
        }
    }

    pub fn stream(mut self, append: StreamAppend) -> Self {
        self.streams.push(append);
        self
    }

    pub fn push(&mut self, append: StreamAppend) {
        self.streams.push(append);
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.streams.iter().map(|s| s.events.len()).sum()
    }
}

impl Default for Commit {
    fn default() -> Self {
        Self::new()
    }
}

/// Transactional storage for versioned records.
///
/// Implementations must be thread-safe. A commit is atomic across every
/// record it touches: either all version checks pass and all changes are
/// stored, or nothing is stored.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Applies a commit atomically.
    ///
    /// Fails with `ConcurrencyConflict` if any record is no longer at its
    /// expected version. Returns the new version of each record, in the
    /// order the streams were given.
    async fn commit(&self, commit: Commit) -> Result<Vec<Version>>;

    /// Returns all changes of one record in version order.
    async fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>>;

    /// Returns the current version of a record, or `None` if it was never written.
    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Returns the identities of every record of the given type.
    async fn list_records(&self, aggregate_type: &str) -> Result<Vec<AggregateId>>;
}

/// Convenience methods available on every store.
#[async_trait]
pub trait EntityStoreExt: EntityStore {
    /// Appends changes to a single record.
    async fn append_stream(&self, append: StreamAppend) -> Result<Version> {
        let versions = self.commit(Commit::new().stream(append)).await?;
        versions
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidCommit("commit returned no versions".to_string()))
    }

    async fn record_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.stream_version(aggregate_id).await?.is_some())
    }
}

impl<T: EntityStore + ?Sized> EntityStoreExt for T {}

/// Checks the shape of a commit before any backend touches storage.
///
/// Rules: at least one stream; every stream has changes; no record appears
/// twice; every change belongs to its stream's record and type; versions run
/// contiguously from `expected_version + 1`.
pub fn validate_commit(commit: &Commit) -> Result<()> {
    if commit.streams.is_empty() {
        return Err(StoreError::InvalidCommit(
            "commit must touch at least one record".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(commit.streams.len());
    for stream in &commit.streams {
        if !seen.insert(stream.aggregate_id) {
            return Err(StoreError::InvalidCommit(format!(
                "record {} appears more than once",
                stream.aggregate_id
            )));
        }

        let Some(first) = stream.events.first() else {
            return Err(StoreError::InvalidCommit(format!(
                "no changes for record {}",
                stream.aggregate_id
            )));
        };

        let mut expected = stream.expected_version;
        for event in &stream.events {
            expected = expected.next();
            if event.aggregate_id != stream.aggregate_id {
                return Err(StoreError::InvalidCommit(format!(
                    "change {} belongs to record {}, not {}",
                    event.event_id, event.aggregate_id, stream.aggregate_id
                )));
            }
            if event.aggregate_type != first.aggregate_type {
                return Err(StoreError::InvalidCommit(format!(
                    "mixed record types for {}",
                    stream.aggregate_id
                )));
            }
            if event.version != expected {
                return Err(StoreError::InvalidCommit(format!(
                    "versions for {} must be contiguous: expected {}, got {}",
                    stream.aggregate_id, expected, event.version
                )));
            }
        }
    }

    Ok(())
}
